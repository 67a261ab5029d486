//! Schema tree sent by the host over the channel.
//!
//! The tree is an immutable description of content types. Structural
//! children are owned directly; self-reference only happens through
//! [`SchemaNode::Inline`], which names a top-level type and is resolved by
//! looking the name up in [`Schema`]'s index rather than by following a link.
//! This keeps ownership acyclic while still allowing recursive content types.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// A top-level schema type: either a document type or a named reusable type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SchemaType {
    Document(DocumentSchema),
    Type(TypeSchema),
}

impl SchemaType {
    pub fn name(&self) -> &str {
        match self {
            SchemaType::Document(doc) => &doc.name,
            SchemaType::Type(ty) => &ty.name,
        }
    }

    pub fn as_document(&self) -> Option<&DocumentSchema> {
        match self {
            SchemaType::Document(doc) => Some(doc),
            SchemaType::Type(_) => None,
        }
    }
}

/// A document type. Documents are the roots of path resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSchema {
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<SmolStr>,
    /// Icon as SVG markup.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default)]
    pub fields: BTreeMap<SmolStr, ObjectField>,
}

/// A named reusable type, referenced from elsewhere with [`SchemaNode::Inline`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSchema {
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<SmolStr>,
    pub value: SchemaNode,
}

/// A node in the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SchemaNode {
    Array(ArrayNode),
    Boolean(BooleanNode),
    Inline(InlineNode),
    Null,
    Number(NumberNode),
    Object(ObjectNode),
    String(StringNode),
    Union(UnionNode),
    Unknown,
}

impl SchemaNode {
    /// The serialized `type` tag of this node.
    pub fn kind(&self) -> &'static str {
        match self {
            SchemaNode::Array(_) => "array",
            SchemaNode::Boolean(_) => "boolean",
            SchemaNode::Inline(_) => "inline",
            SchemaNode::Null => "null",
            SchemaNode::Number(_) => "number",
            SchemaNode::Object(_) => "object",
            SchemaNode::String(_) => "string",
            SchemaNode::Union(_) => "union",
            SchemaNode::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayNode {
    pub of: ArrayMember,
}

/// What an array holds: a single item type or a union of item types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ArrayMember {
    ArrayItem(ArrayItem),
    Union(UnionNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrayItem {
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<SmolStr>,
    pub value: Box<SchemaNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BooleanNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InlineNode {
    /// Name of the referenced top-level type.
    pub name: SmolStr,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectNode {
    #[serde(default)]
    pub fields: BTreeMap<SmolStr, ObjectField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<Box<SchemaNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dereferences_to: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "objectField")]
pub struct ObjectField {
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<SmolStr>,
    pub value: SchemaNode,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StringNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<SmolStr>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UnionNode {
    pub of: Vec<UnionMember>,
}

impl UnionNode {
    /// The named options of this union. Primitive literal unions have none.
    pub fn options(&self) -> impl Iterator<Item = &UnionOption> {
        self.of.iter().filter_map(|member| match member {
            UnionMember::UnionOption(option) => Some(option),
            _ => None,
        })
    }

    /// Find the option matching a path segment.
    ///
    /// Named options match by name. Unions of primitive literals have no
    /// names to match, so the first literal stands in for the whole union.
    pub fn member_for(&self, segment: &str) -> Option<&UnionMember> {
        self.of.iter().find(|member| match member {
            UnionMember::UnionOption(option) => option.name == segment,
            _ => true,
        })
    }
}

/// A member of a union: a named option, or a primitive literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum UnionMember {
    UnionOption(UnionOption),
    String(StringNode),
    Number(NumberNode),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnionOption {
    pub name: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub value: SchemaNode,
}

/// A full schema snapshot with a name index over its top-level types.
///
/// Serializes as the plain list of types, which is what travels in the
/// `presentation/schema` message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SchemaType>", into = "Vec<SchemaType>")]
pub struct Schema {
    types: Vec<SchemaType>,
    by_name: HashMap<SmolStr, usize>,
}

impl Schema {
    pub fn new(types: Vec<SchemaType>) -> Self {
        let mut by_name = HashMap::with_capacity(types.len());
        for (idx, ty) in types.iter().enumerate() {
            // First definition wins on duplicate names.
            by_name.entry(SmolStr::new(ty.name())).or_insert(idx);
        }
        Self { types, by_name }
    }

    pub fn types(&self) -> &[SchemaType] {
        &self.types
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Look up a top-level type by name.
    pub fn get(&self, name: &str) -> Option<&SchemaType> {
        self.by_name.get(name).map(|&idx| &self.types[idx])
    }

    /// Look up a document type by name.
    pub fn document(&self, name: &str) -> Option<&DocumentSchema> {
        self.get(name).and_then(SchemaType::as_document)
    }

    pub fn documents(&self) -> impl Iterator<Item = &DocumentSchema> {
        self.types.iter().filter_map(SchemaType::as_document)
    }
}

impl From<Vec<SchemaType>> for Schema {
    fn from(types: Vec<SchemaType>) -> Self {
        Self::new(types)
    }
}

impl From<Schema> for Vec<SchemaType> {
    fn from(schema: Schema) -> Self {
        schema.types
    }
}
