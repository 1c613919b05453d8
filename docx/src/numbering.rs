//! List numbering definitions.

use std::collections::HashMap;

use tracing::debug;

use crate::error::Result;
use crate::markup::XmlDocument;
use crate::package::DocxPackage;

/// Level formats per numbering instance, resolved through abstract numberings.
#[derive(Debug, Clone, Default)]
pub struct NumberingDefinitions {
    /// numId → abstractNumId
    instances: HashMap<String, String>,
    /// abstractNumId → (ilvl → numFmt)
    formats: HashMap<String, HashMap<u8, String>>,
}

impl NumberingDefinitions {
    pub fn load(package: &DocxPackage) -> Result<Self> {
        let Some(part) = package.numbering_part_name()? else {
            return Ok(Self::default());
        };
        match package.part(&part) {
            Some(bytes) => Self::parse(&part, bytes),
            None => Ok(Self::default()),
        }
    }

    pub fn parse(part: &str, bytes: &[u8]) -> Result<Self> {
        let doc = XmlDocument::parse(part, bytes)?;
        let mut defs = Self::default();

        for abstract_num in doc.root.elements().filter(|el| el.is("abstractNum")) {
            let Some(abstract_id) = abstract_num.attr("abstractNumId") else {
                continue;
            };
            let levels = abstract_num
                .elements()
                .filter(|el| el.is("lvl"))
                .filter_map(|lvl| {
                    let level = lvl.attr("ilvl")?.parse::<u8>().ok()?;
                    let format = lvl.child("numFmt")?.attr("val")?;
                    Some((level, format))
                })
                .collect();
            defs.formats.insert(abstract_id, levels);
        }

        for num in doc.root.elements().filter(|el| el.is("num")) {
            let abstract_id = num.child("abstractNumId").and_then(|el| el.attr("val"));
            if let (Some(num_id), Some(abstract_id)) = (num.attr("numId"), abstract_id) {
                defs.instances.insert(num_id, abstract_id);
            }
        }

        debug!(
            "Loaded {} numbering instances over {} abstract definitions",
            defs.instances.len(),
            defs.formats.len()
        );
        Ok(defs)
    }

    /// The `numFmt` of a list level, e.g. `bullet` or `decimal`.
    pub fn format(&self, num_id: &str, level: u8) -> Option<&str> {
        let abstract_id = self.instances.get(num_id)?;
        self.formats
            .get(abstract_id)?
            .get(&level)
            .map(String::as_str)
    }
}
