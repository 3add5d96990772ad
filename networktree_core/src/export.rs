//! JSON snapshot of the forests.
//!
//! Nodes are serialized straight from the arena through borrowing views, so
//! a snapshot costs one read lock and no copy of the tree.

use crate::errors::Result;
use crate::helpers::Family;
use crate::{NodeRef, PrefixTree};
use serde::ser::{SerializeMap, SerializeStruct, Serializer};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum JsonLayout {
    /// One array: IPv4 roots, then IPv6 roots.
    #[default]
    Merged,
    /// `{"ipv4": [...], "ipv6": [...]}`
    PerFamily,
}

pub fn write_json<W: Write>(tree: &PrefixTree, writer: W, layout: JsonLayout) -> Result<()> {
    serde_json::to_writer_pretty(writer, &Document { tree, layout })?;
    Ok(())
}

pub fn to_json_string(tree: &PrefixTree, layout: JsonLayout) -> Result<String> {
    Ok(serde_json::to_string_pretty(&Document { tree, layout })?)
}

struct Document<'a> {
    tree: &'a PrefixTree,
    layout: JsonLayout,
}

impl Serialize for Document<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.layout {
            JsonLayout::Merged => serializer.collect_seq(
                self.tree
                    .roots(Family::V4)
                    .chain(self.tree.roots(Family::V6))
                    .map(NodeView),
            ),
            JsonLayout::PerFamily => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("ipv4", &Forest(self.tree, Family::V4))?;
                map.serialize_entry("ipv6", &Forest(self.tree, Family::V6))?;
                map.end()
            }
        }
    }
}

struct Forest<'a>(&'a PrefixTree, Family);

impl Serialize for Forest<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.roots(self.1).map(NodeView))
    }
}

struct NodeView<'a>(NodeRef<'a>);

struct Children<'a>(NodeRef<'a>);

impl Serialize for Children<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.children().map(NodeView))
    }
}

impl Serialize for NodeView<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let node = self.0;
        let record = node.annotation().record();
        let location = record.and_then(|r| r.location.as_ref());
        let position = record.and_then(|r| r.position);
        let country = location
            .map(|l| l.country_iso.as_str())
            .or(record.map(|r| r.country.as_str()))
            .unwrap_or("");
        let eu = match location {
            Some(l) if l.is_part_of_eu => "true",
            Some(_) => "false",
            None => "",
        };
        let (latitude, longitude) = match position {
            Some(p) => (format!("{:.6}", p.latitude), format!("{:.6}", p.longitude)),
            None => (String::new(), String::new()),
        };

        let mut out = serializer.serialize_struct("Node", 9)?;
        out.serialize_field("network", &node.network().to_string())?;
        out.serialize_field("cityName", location.map_or("", |l| l.city_name.as_str()))?;
        out.serialize_field("subdivName", location.map_or("", |l| l.subdiv_name.as_str()))?;
        out.serialize_field("countryISO", country)?;
        out.serialize_field("countryName", location.map_or("", |l| l.country_name.as_str()))?;
        out.serialize_field("isPartOfEU", eu)?;
        out.serialize_field("latitude", &latitude)?;
        out.serialize_field("longitude", &longitude)?;
        out.serialize_field("children", &Children(node))?;
        out.end()
    }
}
