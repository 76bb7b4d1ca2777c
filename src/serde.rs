//! Serde integration: an [`IntMap`] serializes as a map with integer
//! keys.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::error::infallible;
use crate::map::IntMap;
use crate::transient::TransientIntMap;

impl<V: Serialize> Serialize for IntMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut out = serializer.serialize_map(None)?;
        for (key, value) in self {
            out.serialize_entry(&key, value)?;
        }
        out.end()
    }
}

struct IntMapVisitor<V>(PhantomData<V>);

impl<'de, V> Visitor<'de> for IntMapVisitor<V>
where
    V: Deserialize<'de> + Clone + PartialEq,
{
    type Value = IntMap<V>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map with unsigned integer keys")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut staged = TransientIntMap::new();
        while let Some((key, value)) = access.next_entry::<u64, V>()? {
            infallible(staged.adjoin_in_place(key, value, &mut |_, _, new: &V| Ok(new.clone())));
        }
        Ok(infallible(staged.persistent()))
    }
}

impl<'de, V> Deserialize<'de> for IntMap<V>
where
    V: Deserialize<'de> + Clone + PartialEq,
{
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(IntMapVisitor(PhantomData))
    }
}
