//! Tickets (`*.tik`) carrying title keys for rights-id encrypted NCAs.

use std::collections::HashMap;

use switch_shelf_core::ParseError;

use crate::bytes::{ReadAt, array_at, read_u32_le};
use crate::partition::Partition;

/// Offsets below are relative to the ticket body, which follows the
/// signature block.
const TITLE_KEY_BLOCK: usize = 0x40;
const TITLE_KEY_TYPE: usize = 0x141;
const RIGHTS_ID: usize = 0x160;
const BODY_SIZE: usize = 0x180;

/// Decoded common ticket.
#[derive(Debug, Clone)]
pub(crate) struct Ticket {
    pub rights_id: [u8; 16],
    /// Title key, still encrypted with the title KEK
    pub encrypted_title_key: [u8; 16],
    pub personalized: bool,
}

/// Size of signature type + signature + padding for a ticket signature type.
fn signature_block_size(sig_type: u32) -> Option<usize> {
    match sig_type {
        0x10000 | 0x10003 => Some(4 + 0x200 + 0x3C),
        0x10001 | 0x10004 => Some(4 + 0x100 + 0x3C),
        0x10002 | 0x10005 => Some(4 + 0x3C + 0x40),
        _ => None,
    }
}

impl Ticket {
    pub(crate) fn parse(data: &[u8]) -> Result<Ticket, ParseError> {
        if data.len() < 4 {
            return Err(ParseError::corrupt("ticket too small"));
        }
        let sig_type = read_u32_le(data, 0);
        let body = signature_block_size(sig_type)
            .ok_or_else(|| ParseError::corrupt(format!("unknown ticket signature 0x{sig_type:X}")))?;
        if data.len() < body + BODY_SIZE {
            return Err(ParseError::corrupt("ticket body truncated"));
        }
        Ok(Ticket {
            rights_id: array_at::<16>(data, body + RIGHTS_ID),
            encrypted_title_key: array_at::<16>(data, body + TITLE_KEY_BLOCK),
            personalized: data[body + TITLE_KEY_TYPE] == 1,
        })
    }
}

/// Load every ticket in the partition, keyed by rights id.
///
/// Unreadable tickets are logged and skipped; a later NCA that needs one
/// fails with a key error instead.
pub(crate) fn collect_tickets(
    src: &mut dyn ReadAt,
    partition: &Partition,
) -> Result<HashMap<[u8; 16], Ticket>, ParseError> {
    let mut tickets = HashMap::new();
    for entry in partition.with_suffix(".tik") {
        let data = entry.read_all(src)?;
        match Ticket::parse(&data) {
            Ok(ticket) => {
                tickets.insert(ticket.rights_id, ticket);
            }
            Err(e) => log::debug!("skipping ticket {}: {}", entry.name, e),
        }
    }
    Ok(tickets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_parse_common_ticket() {
        let rights_id = [0xABu8; 16];
        let key = [0x5Cu8; 16];
        let tik = fixtures::build_ticket(&rights_id, &key);
        let ticket = Ticket::parse(&tik).unwrap();
        assert_eq!(ticket.rights_id, rights_id);
        assert_eq!(ticket.encrypted_title_key, key);
        assert!(!ticket.personalized);
    }

    #[test]
    fn test_unknown_signature() {
        let mut tik = fixtures::build_ticket(&[0u8; 16], &[0u8; 16]);
        tik[0..4].copy_from_slice(&0xDEADu32.to_le_bytes());
        assert!(Ticket::parse(&tik).is_err());
    }
}
