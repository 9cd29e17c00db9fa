//! Field map construction for record shapes.
//!
//! A [`FieldMap`] is built once per record shape from its descriptor table and is read-only
//! afterwards. It records the ordered list of mapped fields together with the position and wire
//! key of the identifier and, when tracked, of the version field.

use std::collections::HashSet;

use crate::{
    error::FieldMapError,
    record::{FieldDescriptor, FieldKind, Record},
};

/// Options controlling how identifier and version fields are located.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapOptions {
    /// In-memory name of the identifier field. Overrides the `identifier` tag when set.
    pub id_field: Option<String>,
    /// In-memory name of the version field. Overrides the `version` tag when set.
    pub version_field: Option<String>,
}

impl FieldMapOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_field(mut self, name: impl Into<String>) -> Self {
        self.id_field = Some(name.into());
        self
    }

    pub fn with_version_field(mut self, name: impl Into<String>) -> Self {
        self.version_field = Some(name.into());
        self
    }
}

/// One mapped field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    /// Position of the field in the record's declaration order.
    pub position: usize,
    pub name: &'static str,
    pub key: &'static str,
    /// Field name to fall back on when the record's serde form does not use the wire key.
    ///
    /// Set for key overrides without a matching `#[serde(rename)]`, unless the name is itself
    /// another field's wire key.
    pub alias: Option<&'static str>,
    pub omit_empty: bool,
    pub identifier: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMap {
    type_name: &'static str,
    fields: Vec<FieldMapping>,
    id_position: usize,
    version_position: Option<usize>,
}

impl FieldMap {
    /// Builds the field map of a record type.
    ///
    /// # Errors
    ///
    /// Fails when the shape has no identifier, more than one identifier, a non-string identifier,
    /// more than one version field, or two fields sharing a wire key.
    pub fn build<R: Record>(options: &FieldMapOptions) -> Result<Self, FieldMapError> {
        Self::from_descriptors(R::type_name(), R::fields(), options)
    }

    /// Builds a field map from an explicit descriptor table.
    pub fn from_descriptors(
        type_name: &'static str,
        descriptors: &'static [FieldDescriptor],
        options: &FieldMapOptions,
    ) -> Result<Self, FieldMapError> {
        let id_position = find_identifier(type_name, descriptors, options)?;

        let id = &descriptors[id_position];
        if id.kind != FieldKind::String {
            return Err(FieldMapError::IdentifierNotString(
                type_name.to_string(),
                id.name.to_string(),
            ));
        }

        let version_position = find_version(type_name, descriptors, options)?;

        let mut keys = HashSet::with_capacity(descriptors.len());
        let mut fields = Vec::with_capacity(descriptors.len());

        for (position, descriptor) in descriptors.iter().enumerate() {
            let key = descriptor.wire_key();

            if !keys.insert(key) {
                return Err(FieldMapError::DuplicateKey(type_name.to_string(), key.to_string()));
            }

            fields.push(FieldMapping {
                position,
                name: descriptor.name,
                key,
                alias: None,
                omit_empty: descriptor.omit_empty,
                identifier: position == id_position,
            });
        }

        for field in &mut fields {
            if field.name != field.key && !keys.contains(field.name) {
                field.alias = Some(field.name);
            }
        }

        Ok(Self { type_name, fields, id_position, version_position })
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Mapped fields in declaration order.
    pub fn fields(&self) -> &[FieldMapping] {
        &self.fields
    }

    pub fn identifier(&self) -> &FieldMapping {
        &self.fields[self.id_position]
    }

    /// Wire key of the identifier field.
    pub fn id_key(&self) -> &'static str {
        self.identifier().key
    }

    /// The version field, or `None` when version tracking is disabled for this shape.
    pub fn version(&self) -> Option<&FieldMapping> {
        self.version_position.map(|position| &self.fields[position])
    }

    pub fn version_key(&self) -> Option<&'static str> {
        self.version().map(|field| field.key)
    }

    /// Resolves a name to a wire key, accepting either a wire key or an in-memory field name.
    pub fn resolve_key(&self, name: &str) -> Option<&'static str> {
        self.fields
            .iter()
            .find(|field| field.key == name)
            .or_else(|| self.fields.iter().find(|field| field.name == name))
            .map(|field| field.key)
    }
}

fn find_identifier(
    type_name: &str,
    descriptors: &[FieldDescriptor],
    options: &FieldMapOptions,
) -> Result<usize, FieldMapError> {
    if let Some(id_field) = &options.id_field {
        return descriptors
            .iter()
            .position(|descriptor| descriptor.name == id_field.as_str())
            .ok_or_else(|| FieldMapError::UnknownIdentifier(type_name.to_string(), id_field.clone()));
    }

    let tagged = descriptors
        .iter()
        .enumerate()
        .filter(|(_, descriptor)| descriptor.identifier)
        .collect::<Vec<_>>();

    match tagged.as_slice() {
        [] => Err(FieldMapError::MissingIdentifier(type_name.to_string())),
        [(position, _)] => Ok(*position),
        many => Err(FieldMapError::DuplicateIdentifier(
            type_name.to_string(),
            many.iter()
                .map(|(_, descriptor)| descriptor.name.to_string())
                .collect(),
        )),
    }
}

fn find_version(
    type_name: &str,
    descriptors: &[FieldDescriptor],
    options: &FieldMapOptions,
) -> Result<Option<usize>, FieldMapError> {
    // An unknown version field name disables version tracking.
    if let Some(version_field) = &options.version_field {
        return Ok(descriptors
            .iter()
            .position(|descriptor| descriptor.name == version_field.as_str()));
    }

    let tagged = descriptors
        .iter()
        .enumerate()
        .filter(|(_, descriptor)| descriptor.version)
        .collect::<Vec<_>>();

    match tagged.as_slice() {
        [] => Ok(None),
        [(position, _)] => Ok(Some(*position)),
        many => Err(FieldMapError::DuplicateVersion(
            type_name.to_string(),
            many.iter()
                .map(|(_, descriptor)| descriptor.name.to_string())
                .collect(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const USER: &[FieldDescriptor] = &[
        FieldDescriptor::new("id", FieldKind::String).identifier(),
        FieldDescriptor::new("username", FieldKind::String),
        FieldDescriptor::new("email", FieldKind::Optional).omit_empty(),
        FieldDescriptor::new("date_of_birth", FieldKind::Optional).key("dateOfBirth"),
        FieldDescriptor::new("version", FieldKind::Number),
    ];

    #[test]
    fn builds_ordered_mappings() {
        let map = FieldMap::from_descriptors("User", USER, &FieldMapOptions::default()).unwrap();

        let keys = map.fields().iter().map(|f| f.key).collect::<Vec<_>>();
        assert_eq!(keys, vec!["id", "username", "email", "dateOfBirth", "version"]);
        assert_eq!(map.id_key(), "id");
        assert!(map.fields()[0].identifier);
        assert!(map.fields()[2].omit_empty);
        assert_eq!(map.version(), None);
    }

    #[test]
    fn key_overrides_keep_field_name_as_alias() {
        const SWAPPED: &[FieldDescriptor] = &[
            FieldDescriptor::new("id", FieldKind::String).identifier(),
            FieldDescriptor::new("first", FieldKind::String).key("second"),
            FieldDescriptor::new("second", FieldKind::String).key("third"),
        ];

        let map = FieldMap::from_descriptors("User", USER, &FieldMapOptions::default()).unwrap();
        assert_eq!(map.fields()[3].alias, Some("date_of_birth"));
        assert_eq!(map.fields()[1].alias, None);

        let swapped = FieldMap::from_descriptors("Swapped", SWAPPED, &FieldMapOptions::default()).unwrap();
        assert_eq!(swapped.fields()[1].alias, Some("first"));
        assert_eq!(swapped.fields()[2].alias, None);
    }

    #[test]
    fn version_field_is_found_by_name() {
        let options = FieldMapOptions::new().with_version_field("version");
        let map = FieldMap::from_descriptors("User", USER, &options).unwrap();

        assert_eq!(map.version_key(), Some("version"));
    }

    #[test]
    fn unknown_version_field_disables_tracking() {
        let options = FieldMapOptions::new().with_version_field("revision");
        let map = FieldMap::from_descriptors("User", USER, &options).unwrap();

        assert_eq!(map.version(), None);
    }

    #[test]
    fn id_field_override_by_name() {
        const SHAPE: &[FieldDescriptor] = &[
            FieldDescriptor::new("code", FieldKind::String).key("userCode"),
            FieldDescriptor::new("name", FieldKind::String),
        ];
        let options = FieldMapOptions::new().with_id_field("code");
        let map = FieldMap::from_descriptors("Shape", SHAPE, &options).unwrap();

        assert_eq!(map.id_key(), "userCode");
        assert_eq!(map.identifier().position, 0);
    }

    #[test]
    fn missing_identifier_fails() {
        const SHAPE: &[FieldDescriptor] = &[FieldDescriptor::new("name", FieldKind::String)];

        assert_eq!(
            FieldMap::from_descriptors("Shape", SHAPE, &FieldMapOptions::default()),
            Err(FieldMapError::MissingIdentifier("Shape".to_string())),
        );
    }

    #[test]
    fn unknown_identifier_name_fails() {
        let options = FieldMapOptions::new().with_id_field("uid");

        assert_eq!(
            FieldMap::from_descriptors("User", USER, &options),
            Err(FieldMapError::UnknownIdentifier("User".to_string(), "uid".to_string())),
        );
    }

    #[test]
    fn duplicate_identifier_fails() {
        const SHAPE: &[FieldDescriptor] = &[
            FieldDescriptor::new("id", FieldKind::String).identifier(),
            FieldDescriptor::new("code", FieldKind::String).identifier(),
        ];

        assert_eq!(
            FieldMap::from_descriptors("Shape", SHAPE, &FieldMapOptions::default()),
            Err(FieldMapError::DuplicateIdentifier(
                "Shape".to_string(),
                vec!["id".to_string(), "code".to_string()],
            )),
        );
    }

    #[test]
    fn non_string_identifier_fails() {
        const SHAPE: &[FieldDescriptor] = &[
            FieldDescriptor::new("id", FieldKind::Number).identifier(),
            FieldDescriptor::new("name", FieldKind::String),
        ];

        assert_eq!(
            FieldMap::from_descriptors("Shape", SHAPE, &FieldMapOptions::default()),
            Err(FieldMapError::IdentifierNotString("Shape".to_string(), "id".to_string())),
        );
    }

    #[test]
    fn optional_identifier_is_not_a_string() {
        const SHAPE: &[FieldDescriptor] =
            &[FieldDescriptor::new("id", FieldKind::Optional).identifier()];

        assert!(matches!(
            FieldMap::from_descriptors("Shape", SHAPE, &FieldMapOptions::default()),
            Err(FieldMapError::IdentifierNotString(_, _)),
        ));
    }

    #[test]
    fn duplicate_version_tags_fail() {
        const SHAPE: &[FieldDescriptor] = &[
            FieldDescriptor::new("id", FieldKind::String).identifier(),
            FieldDescriptor::new("v1", FieldKind::Number).version(),
            FieldDescriptor::new("v2", FieldKind::Number).version(),
        ];

        assert!(matches!(
            FieldMap::from_descriptors("Shape", SHAPE, &FieldMapOptions::default()),
            Err(FieldMapError::DuplicateVersion(_, _)),
        ));
    }

    #[test]
    fn duplicate_wire_keys_fail() {
        const SHAPE: &[FieldDescriptor] = &[
            FieldDescriptor::new("id", FieldKind::String).identifier(),
            FieldDescriptor::new("name", FieldKind::String),
            FieldDescriptor::new("full_name", FieldKind::String).key("name"),
        ];

        assert_eq!(
            FieldMap::from_descriptors("Shape", SHAPE, &FieldMapOptions::default()),
            Err(FieldMapError::DuplicateKey("Shape".to_string(), "name".to_string())),
        );
    }

    #[test]
    fn resolves_keys_by_wire_key_or_name() {
        let map = FieldMap::from_descriptors("User", USER, &FieldMapOptions::default()).unwrap();

        assert_eq!(map.resolve_key("dateOfBirth"), Some("dateOfBirth"));
        assert_eq!(map.resolve_key("date_of_birth"), Some("dateOfBirth"));
        assert_eq!(map.resolve_key("unknown"), None);
    }
}
