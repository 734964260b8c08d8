use std::collections::HashSet;

use anyhow::{bail, Result};

use crate::{
    field::{FieldDescriptor, FieldKind},
    resource::{FieldSet, Resource, ResourceId},
    value::PasswordEncoding,
    warnings::Warnings,
};

/// Describes one resource type: its keyword and the fields a resource of the type may hold
#[derive(Debug)]
pub struct ResourceType {
    pub name: &'static str,
    /// Plural display name, as used for include directories and listings
    pub group_name: &'static str,
    /// The type tag; also the index of the type's chain in a registry snapshot
    pub rcode: u32,
    pub fields: &'static [FieldDescriptor],
    /// A legacy keyword still accepted in place of `name`
    pub alias: Option<&'static str>,
}

impl ResourceType {
    /// Allocates an empty resource of this type
    pub fn instantiate(&'static self, id: ResourceId) -> Resource {
        Resource::new(self, id)
    }

    /// Looks up a field by keyword, falling back to field aliases
    pub fn find_field(
        &self,
        keyword: &str,
        warnings: &mut Warnings,
    ) -> Option<(usize, &'static FieldDescriptor)> {
        find_field(self.fields, keyword, warnings)
    }
}

/// A complete catalog of the resource types one daemon understands
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    /// Resource types, positioned by their `rcode`
    pub types: &'static [ResourceType],
    /// Per resource type encoding for [`PasswordKind::Auto`](crate::PasswordKind::Auto) fields
    pub auto_password: &'static [(u32, PasswordEncoding)],
}

impl Schema {
    /// Looks up a resource type by keyword, falling back to type aliases
    pub fn find_type(&self, keyword: &str, warnings: &mut Warnings) -> Option<&'static ResourceType> {
        if let Some(rtype) = self.types.iter().find(|t| keyword_eq(t.name, keyword)) {
            return Some(rtype);
        }
        let rtype = self
            .types
            .iter()
            .find(|t| t.alias.map_or(false, |alias| keyword_eq(alias, keyword)))?;
        warnings.add(format!(
            "Found resource alias usage \"{}\" in configuration which is discouraged, consider using \"{}\" instead",
            keyword, rtype.name
        ));
        Some(rtype)
    }

    pub fn resource_type(&self, rcode: u32) -> Option<&'static ResourceType> {
        self.types.get(rcode as usize)
    }

    /// How an automatic password is stored in resources of the given type (hashed unless listed)
    pub fn auto_password_encoding(&self, rcode: u32) -> PasswordEncoding {
        self.auto_password
            .iter()
            .find(|(code, _)| *code == rcode)
            .map(|(_, encoding)| *encoding)
            .unwrap_or(PasswordEncoding::Md5)
    }

    /// Checks the catalog is consistent: type tags match positions, and keywords are unique
    pub fn validate(&self) -> Result<()> {
        let mut keywords = HashSet::new();
        for (position, rtype) in self.types.iter().enumerate() {
            if rtype.rcode as usize != position {
                bail!(
                    "Resource type {} has tag {} but is at position {}",
                    rtype.name,
                    rtype.rcode,
                    position
                );
            }
            for keyword in std::iter::once(rtype.name).chain(rtype.alias) {
                if !keywords.insert(normalize(keyword)) {
                    bail!("Resource type keyword \"{}\" is defined twice", keyword);
                }
            }
            validate_fields(rtype.name, rtype.fields)?;
        }
        Ok(())
    }
}

fn validate_fields(owner: &str, fields: &'static [FieldDescriptor]) -> Result<()> {
    if fields.len() > FieldSet::CAPACITY {
        bail!(
            "{} has {} fields, at most {} are supported",
            owner,
            fields.len(),
            FieldSet::CAPACITY
        );
    }
    let mut keywords = HashSet::new();
    for field in fields {
        for keyword in std::iter::once(field.name).chain(field.alias) {
            if !keywords.insert(normalize(keyword)) {
                bail!("Keyword \"{}\" is defined twice in {}", keyword, owner);
            }
        }
        match field.kind {
            FieldKind::Block(block) => validate_fields(block.name, block.fields)?,
            FieldKind::Run(run) => validate_fields(field.name, run.fields)?,
            FieldKind::Address(sibling) | FieldKind::Port(sibling) => {
                if !fields
                    .iter()
                    .any(|f| matches!(f.kind, FieldKind::Addresses) && keyword_eq(f.name, sibling))
                {
                    bail!("{} refers to missing addresses field {}", field.name, sibling);
                }
            }
            _ => {}
        }
    }
    Ok(())
}

/// Looks up a field by keyword in a field list, falling back to aliases
///
/// An alias match records a warning, once per distinct keyword.
pub fn find_field(
    fields: &'static [FieldDescriptor],
    keyword: &str,
    warnings: &mut Warnings,
) -> Option<(usize, &'static FieldDescriptor)> {
    if let Some(found) = fields.iter().enumerate().find(|(_, f)| keyword_eq(f.name, keyword)) {
        return Some(found);
    }
    let (index, field) = fields
        .iter()
        .enumerate()
        .find(|(_, f)| f.alias.map_or(false, |alias| keyword_eq(alias, keyword)))?;
    warnings.add(format!(
        "Found directive alias usage \"{}\" in configuration which is discouraged, consider using \"{}\" instead",
        keyword, field.name
    ));
    Some((index, field))
}

/// Compares two keywords ignoring ASCII case and spaces
///
/// ```
/// use resconf_schema::keyword_eq;
///
/// assert!(keyword_eq("MaximumConcurrentJobs", "Maximum Concurrent Jobs"));
/// assert!(keyword_eq("pool", "Pool"));
/// assert!(!keyword_eq("Pool", "Pools"));
/// ```
pub fn keyword_eq(a: &str, b: &str) -> bool {
    let a = a.bytes().filter(|c| *c != b' ');
    let b = b.bytes().filter(|c| *c != b' ');
    a.map(|c| c.to_ascii_lowercase())
        .eq(b.map(|c| c.to_ascii_lowercase()))
}

fn normalize(keyword: &str) -> String {
    keyword
        .chars()
        .filter(|c| *c != ' ')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldKind, ReferenceStorage};

    static POOL_FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor::new("Name", FieldKind::Name).required(),
        FieldDescriptor::new("Maximum Volumes", FieldKind::PositiveInt32).alias("MaxVols"),
    ];
    static JOB_FIELDS: &[FieldDescriptor] = &[
        FieldDescriptor::new("Name", FieldKind::Name).required(),
        FieldDescriptor::new(
            "Pool",
            FieldKind::Reference {
                target: 0,
                storage: ReferenceStorage::Single,
            },
        ),
    ];
    static TYPES: &[ResourceType] = &[
        ResourceType {
            name: "Pool",
            group_name: "Pools",
            rcode: 0,
            fields: POOL_FIELDS,
            alias: None,
        },
        ResourceType {
            name: "Job",
            group_name: "Jobs",
            rcode: 1,
            fields: JOB_FIELDS,
            alias: Some("Task"),
        },
    ];
    static SCHEMA: Schema = Schema {
        name: "test",
        types: TYPES,
        auto_password: &[(1, PasswordEncoding::Clear)],
    };

    #[test]
    fn find_type_ignores_case_and_reports_aliases_once() {
        let mut warnings = Warnings::default();
        assert_eq!(SCHEMA.find_type("pool", &mut warnings).map(|t| t.rcode), Some(0));
        assert!(warnings.is_empty());
        assert_eq!(SCHEMA.find_type("TASK", &mut warnings).map(|t| t.rcode), Some(1));
        assert_eq!(SCHEMA.find_type("Task", &mut warnings).map(|t| t.rcode), Some(1));
        assert_eq!(warnings.len(), 2);
        assert_eq!(SCHEMA.find_type("Task", &mut warnings).map(|t| t.rcode), Some(1));
        assert_eq!(warnings.len(), 2);
        assert!(SCHEMA.find_type("Storage", &mut warnings).is_none());
    }

    #[test]
    fn find_field_matches_spaced_keywords_and_aliases() {
        let mut warnings = Warnings::default();
        let pool = &TYPES[0];
        let (index, _) = pool.find_field("MaximumVolumes", &mut warnings).unwrap();
        assert_eq!(index, 1);
        assert!(warnings.is_empty());
        let (index, field) = pool.find_field("maxvols", &mut warnings).unwrap();
        assert_eq!(index, 1);
        assert_eq!(field.name, "Maximum Volumes");
        assert_eq!(warnings.len(), 1);
        assert!(pool.find_field("Volumes", &mut warnings).is_none());
    }

    #[test]
    fn auto_password_encoding_defaults_to_hashed() {
        assert_eq!(SCHEMA.auto_password_encoding(1), PasswordEncoding::Clear);
        assert_eq!(SCHEMA.auto_password_encoding(0), PasswordEncoding::Md5);
    }

    #[test]
    fn validate_accepts_consistent_catalog() {
        SCHEMA.validate().unwrap();
    }

    #[test]
    fn validate_rejects_duplicate_keywords() {
        static FIELDS: &[FieldDescriptor] = &[
            FieldDescriptor::new("Name", FieldKind::Name),
            FieldDescriptor::new("Label", FieldKind::Str).alias("name"),
        ];
        static TYPES: &[ResourceType] = &[ResourceType {
            name: "Pool",
            group_name: "Pools",
            rcode: 0,
            fields: FIELDS,
            alias: None,
        }];
        let schema = Schema {
            name: "broken",
            types: TYPES,
            auto_password: &[],
        };
        let error = schema.validate().unwrap_err();
        assert!(error.to_string().contains("defined twice"), "{error}");
    }

    #[test]
    fn validate_rejects_misplaced_type_tags() {
        static TYPES: &[ResourceType] = &[ResourceType {
            name: "Pool",
            group_name: "Pools",
            rcode: 3,
            fields: POOL_FIELDS,
            alias: None,
        }];
        let schema = Schema {
            name: "broken",
            types: TYPES,
            auto_password: &[],
        };
        assert!(schema.validate().is_err());
    }
}
