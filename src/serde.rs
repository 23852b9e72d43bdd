//! `serde` support: a [`Sequence`] serializes as a serde sequence.

use core::fmt;
use core::marker::PhantomData;

use allocator_api2::alloc::{Allocator, Global};
use serde::ser::SerializeSeq;

use crate::containers::Sequence;

// Upper bound on capacity reserved from an untrusted size hint.
const MAX_PREALLOC: usize = 4096;

impl<T: serde::Serialize, A: Allocator> serde::Serialize for Sequence<T, A> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for item in self.iter() {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}

struct SequenceVisitor<T>(PhantomData<T>);

impl<'de, T: serde::Deserialize<'de>> serde::de::Visitor<'de> for SequenceVisitor<T> {
    type Value = Sequence<T, Global>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a sequence")
    }

    fn visit_seq<V>(self, mut access: V) -> Result<Self::Value, V::Error>
    where
        V: serde::de::SeqAccess<'de>,
    {
        let hint = access.size_hint().unwrap_or(0).min(MAX_PREALLOC);
        let mut seq = Sequence::new();
        seq.try_reserve(hint).map_err(serde::de::Error::custom)?;
        while let Some(item) = access.next_element()? {
            seq.try_push(item).map_err(serde::de::Error::custom)?;
        }
        Ok(seq)
    }
}

impl<'de, T: serde::Deserialize<'de>> serde::Deserialize<'de> for Sequence<T, Global> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(SequenceVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use crate::Sequence;

    #[test]
    fn serializes_as_json_array() {
        let seq = Sequence::from([1u32, 9, 2, 3]);
        assert_eq!(serde_json::to_string(&seq).unwrap(), "[1,9,2,3]");
        assert_eq!(serde_json::to_string(&Sequence::<u8>::new()).unwrap(), "[]");
    }

    #[test]
    fn deserializes_nested_sequences() {
        let seq: Sequence<Sequence<String>> =
            serde_json::from_str(r#"[["a","b"],[],["c"]]"#).unwrap();
        assert_eq!(seq.len(), 3);
        assert_eq!(seq[0], [String::from("a"), String::from("b")]);
        assert!(seq[1].is_empty());
        assert_eq!(seq[2][0], "c");
    }

    #[test]
    fn rejects_non_sequences() {
        let err = serde_json::from_str::<Sequence<u8>>(r#"{"a":1}"#).unwrap_err();
        assert!(err.to_string().contains("a sequence"));
    }
}
