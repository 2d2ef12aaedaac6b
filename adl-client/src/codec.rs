//! Attribute codec.
//!
//! Translates between the client's typed attribute values and the store's
//! wire messages:
//! - staged buffer entries become [`Operation`]s
//! - [`ReadResponse`] results become a [`CacheUpdate`], checked against the
//!   projections that were requested
//! - any protocol message can be framed as a length-prefixed JSON blob for
//!   byte-oriented transports

use crate::buffer::{SetOp, Staged};
use crate::cache::{CacheEntry, CacheUpdate};
use crate::error::{AdlError, AdlResult, RemoteErrorCode};
use crate::projection::{ListRange, Projection};
use crate::protocol::{Operation, ProjectionResult, ReadResponse};
use adl_types::ListItem;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;

/// Maximum frame body size (16 MB).
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const LENGTH_PREFIX: usize = 4;

/// Encodes a message as a 4-byte big-endian length followed by JSON.
pub fn encode_frame<T: Serialize>(message: &T) -> AdlResult<Vec<u8>> {
    let body = serde_json::to_vec(message)?;
    if body.len() > MAX_FRAME_SIZE {
        return Err(AdlError::Frame(format!(
            "message too large: {} bytes",
            body.len()
        )));
    }

    let mut frame = Vec::with_capacity(LENGTH_PREFIX + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);
    Ok(frame)
}

/// Decodes one frame produced by [`encode_frame`].
///
/// The slice must hold exactly one frame.
pub fn decode_frame<T: DeserializeOwned>(frame: &[u8]) -> AdlResult<T> {
    let Some((prefix, body)) = frame.split_first_chunk::<LENGTH_PREFIX>() else {
        return Err(AdlError::Frame(format!(
            "truncated length prefix: {} bytes",
            frame.len()
        )));
    };
    let len = u32::from_be_bytes(*prefix) as usize;

    if len > MAX_FRAME_SIZE {
        return Err(AdlError::Frame(format!("message too large: {len} bytes")));
    }
    if body.len() != len {
        return Err(AdlError::Frame(format!(
            "length mismatch: prefix says {len}, body has {}",
            body.len()
        )));
    }

    Ok(serde_json::from_slice(body)?)
}

/// Size of a message's JSON body on the wire.
pub fn encoded_len<T: Serialize>(message: &T) -> AdlResult<usize> {
    Ok(serde_json::to_vec(message)?.len())
}

/// Encodes one staged buffer entry as wire operations.
///
/// A counter whose deltas cancel out encodes to nothing; one whose net delta
/// does not fit in an `i64` is an error.
pub fn encode_staged(name: &str, staged: &Staged, out: &mut Vec<Operation>) -> AdlResult<()> {
    match staged {
        Staged::Property(value) => out.push(Operation::WriteProperty {
            name: name.to_string(),
            value: value.clone(),
        }),
        Staged::Metadata(value) => out.push(Operation::WriteMetadata {
            name: name.to_string(),
            value: value.clone(),
        }),
        Staged::Counter(0) => {}
        Staged::Counter(delta) => {
            let delta =
                i64::try_from(*delta).map_err(|_| AdlError::CounterOverflow(name.to_string()))?;
            out.push(Operation::IncrementCounter {
                name: name.to_string(),
                delta,
            });
        }
        Staged::Set(members) => {
            for (member, op) in members {
                let (name, member) = (name.to_string(), member.clone());
                out.push(match op {
                    SetOp::Add => Operation::AddSetMember { name, member },
                    SetOp::Remove => Operation::RemoveSetMember { name, member },
                });
            }
        }
        Staged::List(items) => {
            for (key, value) in items {
                out.push(Operation::PutListItem {
                    list: name.to_string(),
                    key: key.clone(),
                    value: value.clone(),
                });
            }
        }
    }
    Ok(())
}

fn malformed(message: impl Into<String>) -> AdlError {
    AdlError::remote(RemoteErrorCode::MalformedResponse, message)
}

fn expect_name(kind: &str, requested: &str, returned: &str) -> AdlResult<()> {
    if requested == returned {
        Ok(())
    } else {
        Err(malformed(format!(
            "{kind} result for {returned:?} answers a projection for {requested:?}"
        )))
    }
}

fn decode_list(range: &ListRange, items: Vec<ListItem>) -> AdlResult<Vec<ListItem>> {
    let mut items = items;
    items.sort_by(|a, b| a.key.cmp(&b.key));

    if let Some(pair) = items.windows(2).find(|w| w[0].key == w[1].key) {
        return Err(malformed(format!(
            "list {:?} returned duplicate key {:?}",
            range.list, pair[0].key
        )));
    }
    if let Some(item) = items.iter().find(|item| !range.contains(&item.key)) {
        return Err(malformed(format!(
            "list {:?} returned key {:?} outside the requested range",
            range.list, item.key
        )));
    }
    if range.limit > 0 && items.len() > range.limit {
        return Err(malformed(format!(
            "list {:?} returned {} items for limit {}",
            range.list,
            items.len(),
            range.limit
        )));
    }
    Ok(items)
}

/// Decodes a read response into cache writes.
///
/// Results must match `projections` one-to-one and in order; anything else
/// is a [`RemoteErrorCode::MalformedResponse`] and nothing is decoded.
pub fn decode_read_response(
    projections: &[Projection],
    response: ReadResponse,
) -> AdlResult<CacheUpdate> {
    if response.results.len() != projections.len() {
        return Err(malformed(format!(
            "expected {} results, got {}",
            projections.len(),
            response.results.len()
        )));
    }

    let mut update = CacheUpdate::default();
    for (projection, result) in projections.iter().zip(response.results) {
        match (projection, result) {
            (Projection::Property { name }, ProjectionResult::Property { name: got, value }) => {
                expect_name("property", name, &got)?;
                update.entries.push(CacheEntry::Property(got, value));
            }
            (Projection::Metadata { name }, ProjectionResult::Metadata { name: got, value }) => {
                expect_name("metadata", name, &got)?;
                update.entries.push(CacheEntry::Metadata(got, value));
            }
            (Projection::Counter { name }, ProjectionResult::Counter { name: got, value }) => {
                expect_name("counter", name, &got)?;
                update.entries.push(CacheEntry::Counter(got, value));
            }
            (Projection::Set { name }, ProjectionResult::Set { name: got, members }) => {
                expect_name("set", name, &got)?;
                let members = members.map(|m| m.into_iter().collect::<BTreeSet<_>>());
                update.entries.push(CacheEntry::Set(got, members));
            }
            (
                Projection::PropertiesWithPrefix { prefix },
                ProjectionResult::PropertiesWithPrefix {
                    prefix: got,
                    properties,
                },
            ) => {
                expect_name("prefix", prefix, &got)?;
                update.entries.push(CacheEntry::PropertyPrefix(got));
                for (name, value) in properties {
                    if !name.starts_with(prefix.as_str()) {
                        return Err(malformed(format!(
                            "property {name:?} does not match prefix {prefix:?}"
                        )));
                    }
                    update.entries.push(CacheEntry::Property(name, Some(value)));
                }
            }
            (Projection::ListRange(range), ProjectionResult::ListRange { list, items }) => {
                expect_name("list", &range.list, &list)?;
                let items = items.map(|items| decode_list(range, items)).transpose()?;
                update.entries.push(CacheEntry::List(list, items));
            }
            (projection, result) => {
                return Err(malformed(format!(
                    "result {result:?} does not answer projection {projection:?}"
                )));
            }
        }
    }
    Ok(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{CommitRequest, ReadRequest};
    use adl_types::{Caller, EntityId};
    use std::collections::BTreeMap;

    #[test]
    fn frame_roundtrip_commit_request() {
        let request = CommitRequest::new(
            EntityId::new("e"),
            Caller::new("u", "p"),
            vec![Operation::IncrementCounter {
                name: "hits".into(),
                delta: 2,
            }],
        );
        let frame = encode_frame(&request).unwrap();
        assert_eq!(
            u32::from_be_bytes(frame[..4].try_into().unwrap()) as usize,
            frame.len() - 4
        );
        let decoded: CommitRequest = decode_frame(&frame).unwrap();
        assert_eq!(decoded, request);
    }

    #[test]
    fn decode_frame_rejects_truncated_prefix() {
        let err = decode_frame::<ReadRequest>(&[0, 1]).unwrap_err();
        assert!(matches!(err, AdlError::Frame(_)));
    }

    #[test]
    fn decode_frame_rejects_oversized_prefix() {
        let len = (MAX_FRAME_SIZE as u32 + 1).to_be_bytes();
        let err = decode_frame::<ReadRequest>(&len).unwrap_err();
        assert!(err.to_string().contains("message too large"));
    }

    #[test]
    fn decode_frame_rejects_length_mismatch() {
        let mut frame = encode_frame(&ReadResponse::default()).unwrap();
        frame.push(b' ');
        assert!(matches!(
            decode_frame::<ReadResponse>(&frame),
            Err(AdlError::Frame(_))
        ));
    }

    #[test]
    fn decode_frame_rejects_bad_json() {
        let mut frame = 4u32.to_be_bytes().to_vec();
        frame.extend_from_slice(b"nope");
        assert!(matches!(
            decode_frame::<ReadResponse>(&frame),
            Err(AdlError::Codec(_))
        ));
    }

    #[test]
    fn zero_counter_encodes_nothing() {
        let mut out = Vec::new();
        encode_staged("c", &Staged::Counter(0), &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn counter_outside_i64_is_rejected() {
        let mut out = Vec::new();
        let staged = Staged::Counter(i128::from(i64::MAX) + 1);
        let err = encode_staged("c", &staged, &mut out).unwrap_err();
        assert!(matches!(err, AdlError::CounterOverflow(ref name) if name == "c"));
        assert!(out.is_empty());
    }

    #[test]
    fn set_entry_encodes_one_op_per_member() {
        let members = BTreeMap::from([
            ("a".to_string(), SetOp::Add),
            ("b".to_string(), SetOp::Remove),
        ]);
        let mut out = Vec::new();
        encode_staged("s", &Staged::Set(members), &mut out).unwrap();
        assert_eq!(
            out,
            vec![
                Operation::AddSetMember {
                    name: "s".into(),
                    member: "a".into()
                },
                Operation::RemoveSetMember {
                    name: "s".into(),
                    member: "b".into()
                },
            ]
        );
    }

    #[test]
    fn decode_rejects_result_count_mismatch() {
        let err = decode_read_response(&[Projection::property("a")], ReadResponse::default())
            .unwrap_err();
        assert_eq!(err.remote_code(), Some(RemoteErrorCode::MalformedResponse));
    }

    #[test]
    fn decode_rejects_kind_mismatch() {
        let response = ReadResponse {
            results: vec![ProjectionResult::Counter {
                name: "a".into(),
                value: Some(1),
            }],
        };
        let err = decode_read_response(&[Projection::property("a")], response).unwrap_err();
        assert_eq!(err.remote_code(), Some(RemoteErrorCode::MalformedResponse));
    }

    #[test]
    fn decode_rejects_name_mismatch() {
        let response = ReadResponse {
            results: vec![ProjectionResult::Property {
                name: "b".into(),
                value: None,
            }],
        };
        assert!(decode_read_response(&[Projection::property("a")], response).is_err());
    }

    #[test]
    fn decode_prefix_expands_into_properties() {
        let response = ReadResponse {
            results: vec![ProjectionResult::PropertiesWithPrefix {
                prefix: "prop".into(),
                properties: vec![
                    ("propX".into(), "x".into()),
                    ("propY".into(), "y".into()),
                ],
            }],
        };
        let update =
            decode_read_response(&[Projection::properties_with_prefix("prop")], response).unwrap();
        assert_eq!(
            update.entries,
            vec![
                CacheEntry::PropertyPrefix("prop".into()),
                CacheEntry::Property("propX".into(), Some("x".into())),
                CacheEntry::Property("propY".into(), Some("y".into())),
            ]
        );
    }

    #[test]
    fn decode_prefix_rejects_foreign_names() {
        let response = ReadResponse {
            results: vec![ProjectionResult::PropertiesWithPrefix {
                prefix: "prop".into(),
                properties: vec![("other".into(), "x".into())],
            }],
        };
        assert!(
            decode_read_response(&[Projection::properties_with_prefix("prop")], response).is_err()
        );
    }

    #[test]
    fn decode_set_deduplicates_members() {
        let response = ReadResponse {
            results: vec![ProjectionResult::Set {
                name: "s".into(),
                members: Some(vec!["b".into(), "a".into(), "b".into()]),
            }],
        };
        let update = decode_read_response(&[Projection::set("s")], response).unwrap();
        let expected: BTreeSet<String> = ["a".to_string(), "b".to_string()].into();
        assert_eq!(
            update.entries,
            vec![CacheEntry::Set("s".into(), Some(expected))]
        );
    }

    #[test]
    fn decode_list_sorts_and_checks_range() {
        let projection = Projection::list_range("L", "2", "", 0);
        let response = ReadResponse {
            results: vec![ProjectionResult::ListRange {
                list: "L".into(),
                items: Some(vec![ListItem::new("3", "c"), ListItem::new("2", "b")]),
            }],
        };
        let update = decode_read_response(std::slice::from_ref(&projection), response).unwrap();
        assert_eq!(
            update.entries,
            vec![CacheEntry::List(
                "L".into(),
                Some(vec![ListItem::new("2", "b"), ListItem::new("3", "c")])
            )]
        );

        let out_of_range = ReadResponse {
            results: vec![ProjectionResult::ListRange {
                list: "L".into(),
                items: Some(vec![ListItem::new("1", "a")]),
            }],
        };
        assert!(decode_read_response(&[projection], out_of_range).is_err());
    }

    #[test]
    fn decode_list_rejects_duplicates_and_overflow() {
        let dupes = ReadResponse {
            results: vec![ProjectionResult::ListRange {
                list: "L".into(),
                items: Some(vec![ListItem::new("1", "a"), ListItem::new("1", "b")]),
            }],
        };
        assert!(decode_read_response(&[Projection::list_range("L", "", "", 0)], dupes).is_err());

        let overflow = ReadResponse {
            results: vec![ProjectionResult::ListRange {
                list: "L".into(),
                items: Some(vec![ListItem::new("1", "a"), ListItem::new("2", "b")]),
            }],
        };
        assert!(
            decode_read_response(&[Projection::list_range("L", "", "", 1)], overflow).is_err()
        );
    }
}
