use std::iter::repeat;
use std::path::{Path, PathBuf};

use bson::spec::BinarySubtype;
use bson::{doc, Binary, Bson, Document};
use uuid::Uuid;

pub fn find_first_subpath<P: AsRef<Path>, F: Fn(&Path) -> bool>(
    root: impl AsRef<Path>,
    subpaths: &[P],
    search: F,
) -> Option<PathBuf> {
    subpaths
        .iter()
        .zip(repeat(root.as_ref()))
        .map(|(b, a)| a.join(b))
        .find(|it: &PathBuf| search(it))
}

#[inline]
pub fn uuid_bson(id: Uuid) -> Bson {
    Bson::Binary(Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.as_bytes().to_vec(),
    })
}

/// `{"_id": <id>}` filter matching the binary UUID key scheme.
#[inline]
pub fn by_id(id: Uuid) -> Document {
    doc! { "_id": uuid_bson(id) }
}

/// Serde helper for JWT claims; `iat`/`exp` must be numeric dates.
pub mod date_time_as_unix_seconds {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(date: &DateTime<Utc>, s: S) -> Result<S::Ok, S::Error> {
        date.timestamp().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        let seconds = i64::deserialize(d)?;
        Utc.timestamp_opt(seconds, 0)
            .single()
            .ok_or_else(|| serde::de::Error::custom("timestamp out of range"))
    }
}

/// Serde helper storing `Vec<Uuid>` reference fields as BSON binary UUIDs,
/// matching the `_id` representation so `$in`/`$pull` filters line up.
pub mod uuid_vec_as_binary {
    use bson::spec::BinarySubtype;
    use bson::Binary;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use uuid::Uuid;

    pub fn serialize<S: Serializer>(ids: &[Uuid], s: S) -> Result<S::Ok, S::Error> {
        let bins: Vec<Binary> = ids
            .iter()
            .map(|id| Binary {
                subtype: BinarySubtype::Uuid,
                bytes: id.as_bytes().to_vec(),
            })
            .collect();
        bins.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<Uuid>, D::Error> {
        let bins = Vec::<Binary>::deserialize(d)?;
        bins.into_iter()
            .map(|bin| Uuid::from_slice(&bin.bytes).map_err(serde::de::Error::custom))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_filter_uses_binary_uuid_subtype() {
        let id = Uuid::new_v4();
        let filter = by_id(id);

        match filter.get("_id") {
            Some(Bson::Binary(bin)) => {
                assert_eq!(bin.subtype, BinarySubtype::Uuid);
                assert_eq!(bin.bytes, id.as_bytes().to_vec());
            }
            other => panic!("expected binary _id, got {:?}", other),
        }
    }

    #[test]
    fn uuid_vec_round_trips_through_bson() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Holder {
            #[serde(with = "uuid_vec_as_binary")]
            ids: Vec<Uuid>,
        }

        let holder = Holder {
            ids: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        let doc = bson::to_document(&holder).expect("serializable");
        let back: Holder = bson::from_document(doc).expect("deserializable");

        assert_eq!(holder.ids, back.ids);
    }
}
