use super::*;
use std::path::PathBuf;

use switch_shelf_core::{
    ContainerFormat, ContainerKind, DecodedContent, DisplayNames, Language, SilentProgress,
};

use crate::local::ContainerFile;

const GAME: TitleId = TitleId::new(0x0100_AAAA_0000_0000);
const GAME_UPD: TitleId = TitleId::new(0x0100_AAAA_0000_0800);
const GAME_DLC: TitleId = TitleId::new(0x0100_AAAA_0000_1001);
const OTHER: TitleId = TitleId::new(0x0100_BBBB_0000_0000);

struct Library {
    dir: tempfile::TempDir,
    catalog: LocalCatalog,
}

impl Library {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            catalog: LocalCatalog::new(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Write a file and record its contents in the catalog.
    fn add(&mut self, rel: &str, kind: ContainerKind, contents: &[(TitleId, u32)]) -> FileId {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, rel).unwrap();
        let id = self.catalog.add_file(ContainerFile {
            folder: path.parent().unwrap().to_path_buf(),
            file_name: path.file_name().unwrap().to_string_lossy().into_owned(),
            size: rel.len() as u64,
            kind,
            format: ContainerFormat::from_path(&path).unwrap_or(ContainerFormat::Nsp),
            volumes: Vec::new(),
        });
        for &(title_id, version) in contents {
            let mut content = DecodedContent::new(title_id, version);
            if title_id.content_type() == ContentType::Base {
                content.names =
                    DisplayNames::new().with(Language::AmericanEnglish, "Star Fox: Zero™");
            }
            self.catalog.add_record(ContentRecord::from_decoded(content, id));
        }
        id
    }

    fn standard() -> Self {
        let mut lib = Self::new();
        lib.add("incoming/game.nsp", ContainerKind::SingleContent, &[(GAME, 0)]);
        lib.add("incoming/upd0.nsp", ContainerKind::SingleContent, &[(GAME_UPD, 0)]);
        lib.add("incoming/upd1.nsp", ContainerKind::SingleContent, &[(GAME_UPD, 65536)]);
        lib.add("incoming/upd2.nsp", ContainerKind::SingleContent, &[(GAME_UPD, 131072)]);
        lib.add("incoming/dlc.nsp", ContainerKind::SingleContent, &[(GAME_DLC, 0)]);
        lib
    }

    fn exists(&self, rel: &str) -> bool {
        self.root().join(rel).exists()
    }
}

fn full_options() -> OrganizeOptions {
    OrganizeOptions {
        create_folder_per_game: true,
        rename_files: true,
        delete_empty_folders: true,
        delete_old_update_files: true,
        ..OrganizeOptions::default()
    }
}

#[test]
fn test_sanitize() {
    assert_eq!(
        sanitize("Star Fox: Zero™  ()[0100AAAA00000000]", true),
        "Star Fox Zero [0100AAAA00000000]"
    );
    assert_eq!(sanitize("Pokémon ()", true), "Pokmon");
    assert_eq!(sanitize("Pokémon ()", false), "Pokémon");
    assert_eq!(sanitize("a/b\\c?[]", true), "abc");
    assert_eq!(sanitize("Title...", true), "Title");
}

#[test]
fn test_empty_folder_template_rejected_before_any_change() {
    let mut lib = Library::standard();
    let before = lib.catalog.clone();
    for template in ["", "{REGION}", "[{REGION}] ()", "..."] {
        let options = OrganizeOptions {
            folder_name_template: template.to_string(),
            ..full_options()
        };
        let err = organize(lib.dir.path(), &mut lib.catalog, None, &options, &SilentProgress)
            .unwrap_err();
        assert!(matches!(err, OrganizeError::InvalidTemplate(_)), "{template:?}");
    }
    assert_eq!(lib.catalog, before);
    assert!(lib.exists("incoming/upd0.nsp"));
    assert!(lib.exists("incoming/game.nsp"));
}

#[test]
fn test_file_template_needs_a_name_for_every_type() {
    let options = OrganizeOptions {
        rename_files: true,
        file_name_template: "{DLC_NAME}".to_string(),
        ..OrganizeOptions::default()
    };
    assert!(matches!(
        validate_templates(&options),
        Err(OrganizeError::InvalidTemplate(_))
    ));

    // Disabled templates are not checked
    let options = OrganizeOptions {
        rename_files: false,
        ..options
    };
    assert!(validate_templates(&options).is_ok());
}

#[test]
fn test_organize_moves_renames_and_cleans_up() {
    let mut lib = Library::standard();
    let summary = organize(
        lib.dir.path(),
        &mut lib.catalog,
        None,
        &full_options(),
        &SilentProgress,
    )
    .unwrap();

    assert_eq!(summary.deleted, 2);
    assert_eq!(summary.moved, 3);
    assert!(summary.errors.is_empty(), "{:?}", summary.errors);
    assert!(summary.conflicts.is_empty());
    assert_eq!(summary.folders_removed, 1);

    assert!(lib.exists("Star Fox Zero/Star Fox Zero [0100AAAA00000000][v0].nsp"));
    assert!(lib.exists("Star Fox Zero/Star Fox Zero [0100AAAA00000800][v131072].nsp"));
    assert!(lib.exists("Star Fox Zero/Star Fox Zero [0100AAAA00001001][v0].nsp"));
    assert!(!lib.exists("incoming"));

    // The catalog follows the files
    let family = lib.catalog.family(GAME).unwrap();
    assert_eq!(family.updates.len(), 1);
    assert_eq!(family.updates[0].version, 131072);
    let base_file = lib.catalog.file(family.base.as_ref().unwrap().file).unwrap();
    assert_eq!(base_file.folder, lib.root().join("Star Fox Zero"));
    assert_eq!(lib.catalog.num_files(), 3);
}

#[test]
fn test_second_run_is_a_no_op() {
    let mut lib = Library::standard();
    organize(lib.dir.path(), &mut lib.catalog, None, &full_options(), &SilentProgress).unwrap();
    let after_first = lib.catalog.clone();

    let plan = plan_organize(lib.dir.path(), &lib.catalog, None, &full_options()).unwrap();
    assert!(plan.moves.is_empty());
    assert!(plan.deletions.is_empty());
    assert_eq!(plan.already_in_place.len(), 3);

    let summary = execute_organize(&plan, &mut lib.catalog, &SilentProgress);
    assert_eq!(summary.moved, 0);
    assert_eq!(summary.deleted, 0);
    assert_eq!(summary.already_in_place, 3);
    assert_eq!(lib.catalog, after_first);
}

#[test]
fn test_cleanup_keeps_newest_update_base_and_addons() {
    let mut lib = Library::standard();
    // A multi-content bundle holding an old update is never deleted
    lib.add(
        "incoming/bundle.xci",
        ContainerKind::MultiContent,
        &[(OTHER, 0), (GAME_UPD, 0)],
    );
    let options = OrganizeOptions {
        delete_old_update_files: true,
        ..OrganizeOptions::default()
    };
    let plan = plan_organize(lib.dir.path(), &lib.catalog, None, &options).unwrap();
    assert!(plan.moves.is_empty());
    let mut deleted: Vec<u32> = plan.deletions.iter().map(|d| d.version).collect();
    deleted.sort();
    assert_eq!(deleted, vec![0, 65536]);
    assert!(plan.deletions.iter().all(|d| d.title_id == GAME_UPD));

    let summary = execute_organize(&plan, &mut lib.catalog, &SilentProgress);
    assert_eq!(summary.deleted, 2);
    assert!(lib.exists("incoming/game.nsp"));
    assert!(lib.exists("incoming/upd2.nsp"));
    assert!(lib.exists("incoming/dlc.nsp"));
    assert!(lib.exists("incoming/bundle.xci"));
    assert!(!lib.exists("incoming/upd0.nsp"));
    assert!(!lib.exists("incoming/upd1.nsp"));

    let family = lib.catalog.family(GAME).unwrap();
    assert_eq!(family.latest_update().map(|u| u.version), Some(131072));
    assert!(family.has_base());
    assert_eq!(family.addons.len(), 1);
}

#[test]
fn test_destination_conflict_is_per_file() {
    let mut lib = Library::new();
    lib.add("a/game.nsp", ContainerKind::SingleContent, &[(GAME, 0)]);
    lib.add("b/game.nsp", ContainerKind::SingleContent, &[(OTHER, 0)]);
    // A stranger already sits where the base would go
    fs::create_dir_all(lib.root().join("Star Fox Zero")).unwrap();
    fs::write(lib.root().join("Star Fox Zero/game.nsp"), "occupied").unwrap();

    let options = OrganizeOptions {
        create_folder_per_game: true,
        ..OrganizeOptions::default()
    };
    let summary =
        organize(lib.dir.path(), &mut lib.catalog, None, &options, &SilentProgress).unwrap();
    assert_eq!(summary.conflicts.len(), 2);
    assert!(summary.conflicts[0].starts_with("Destination already exists"));
    assert_eq!(summary.moved, 0);
    assert!(lib.exists("a/game.nsp"));
    assert!(lib.exists("b/game.nsp"));
}

#[test]
fn test_split_sets_left_in_place_and_multi_content_keeps_name() {
    let mut lib = Library::new();
    lib.add("in/Split.nsp", ContainerKind::SplitVolume, &[(GAME, 0)]);
    lib.add(
        "in/Bundle.xci",
        ContainerKind::MultiContent,
        &[(OTHER, 0), (TitleId::new(0x0100_BBBB_0000_0800), 65536)],
    );
    let options = OrganizeOptions {
        create_folder_per_game: true,
        rename_files: true,
        ..OrganizeOptions::default()
    };
    let plan = plan_organize(lib.dir.path(), &lib.catalog, None, &options).unwrap();
    assert_eq!(plan.skipped_split, vec![lib.root().join("in/Split.nsp")]);
    assert_eq!(plan.moves.len(), 1);
    assert_eq!(plan.moves[0].target.file_name().unwrap(), "Bundle.xci");
}

#[cfg(unix)]
#[test]
fn test_empty_folder_cleanup_skips_symlinks() {
    let lib = Library::new();
    let outside = tempfile::tempdir().unwrap();
    fs::create_dir_all(outside.path().join("keep/me")).unwrap();
    fs::create_dir_all(lib.root().join("old/nested")).unwrap();
    fs::create_dir_all(lib.root().join("games")).unwrap();
    fs::write(lib.root().join("games/a.nsp"), "data").unwrap();
    std::os::unix::fs::symlink(outside.path(), lib.root().join("linked")).unwrap();

    let mut errors = Vec::new();
    assert_eq!(remove_empty_folders(lib.root(), &mut errors), 2);
    assert!(errors.is_empty(), "{errors:?}");
    assert!(!lib.exists("old"));
    assert!(lib.exists("games/a.nsp"));
    assert!(fs::symlink_metadata(lib.root().join("linked")).is_ok());
    assert!(outside.path().join("keep/me").is_dir());
}

#[test]
fn test_empty_folder_cleanup_records_errors() {
    let lib = Library::new();
    let mut errors = Vec::new();
    assert_eq!(remove_empty_folders(&lib.root().join("gone"), &mut errors), 0);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Failed to read folder"));
}
