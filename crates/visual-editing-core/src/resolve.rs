//! Schema path resolution.
//!
//! Maps an annotated element to the schema field it displays by walking the
//! document type along the element's content path. Keyed array segments are
//! first rewritten to the member type name reported by the host
//! (`items[_key=="x"]` becomes `items` + `featureHighlight`); segments without
//! a known type become an empty member name so the walk fails softly.
//!
//! Resolution never errors and never panics. Anything the walk cannot follow
//! comes back as [`FieldLookup::unresolved`].

use smol_str::SmolStr;

use crate::node::SanityNode;
use crate::path::{ContentPath, is_keyed_segment, segment_name};
use crate::resolved::ResolvedTypeTable;
use crate::schema::{
    ArrayItem, ArrayMember, ArrayNode, DocumentSchema, ObjectField, ObjectNode, Schema,
    SchemaNode, SchemaType, UnionMember, UnionNode, UnionOption,
};

/// Upper bound on `inline` dereferences in a single walk.
const MAX_INLINE_HOPS: usize = 32;

/// The schema entry an element's path ends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRef<'a> {
    ArrayItem(&'a ArrayItem),
    ObjectField(&'a ObjectField),
    UnionOption(&'a UnionOption),
}

impl<'a> FieldRef<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            FieldRef::ArrayItem(item) => &item.name,
            FieldRef::ObjectField(field) => &field.name,
            FieldRef::UnionOption(option) => &option.name,
        }
    }

    pub fn title(&self) -> Option<&'a str> {
        match self {
            FieldRef::ArrayItem(item) => item.title.as_deref(),
            FieldRef::ObjectField(field) => field.title.as_deref(),
            FieldRef::UnionOption(option) => option.title.as_deref(),
        }
    }

    /// SVG icon markup, only union options carry one.
    pub fn icon(&self) -> Option<&'a str> {
        match self {
            FieldRef::UnionOption(option) => option.icon.as_deref(),
            _ => None,
        }
    }

    pub fn value(&self) -> &'a SchemaNode {
        match self {
            FieldRef::ArrayItem(item) => &item.value,
            FieldRef::ObjectField(field) => &field.value,
            FieldRef::UnionOption(option) => &option.value,
        }
    }

    /// Human readable label: the title, else the name.
    pub fn label(&self) -> &'a str {
        match self.title() {
            Some(title) if !title.is_empty() => title,
            _ => self.name(),
        }
    }
}

/// The schema entry that contains the resolved field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParentRef<'a> {
    Document(&'a DocumentSchema),
    Object(&'a ObjectNode),
    Array(&'a ArrayNode),
    ArrayItem(&'a ArrayItem),
    Union(&'a UnionNode),
    UnionOption(&'a UnionOption),
}

impl<'a> ParentRef<'a> {
    pub fn as_union(&self) -> Option<&'a UnionNode> {
        match self {
            ParentRef::Union(union) => Some(union),
            _ => None,
        }
    }
}

/// Result of resolving a path: the field it ends on and that field's parent.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FieldLookup<'a> {
    pub field: Option<FieldRef<'a>>,
    pub parent: Option<ParentRef<'a>>,
}

impl<'a> FieldLookup<'a> {
    pub fn unresolved() -> Self {
        Self {
            field: None,
            parent: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.field.is_some()
    }
}

/// Find the document type an annotation belongs to.
pub fn get_schema_type<'a>(node: &SanityNode, schema: &'a Schema) -> Option<&'a DocumentSchema> {
    let type_name = node.as_resolved()?.type_name.as_deref()?;
    schema.document(type_name)
}

/// Resolve the field an annotation points at.
pub fn get_field<'a>(
    node: &SanityNode,
    document: &'a DocumentSchema,
    schema: &'a Schema,
    resolved: &ResolvedTypeTable,
) -> FieldLookup<'a> {
    let Some(node) = node.as_resolved() else {
        return FieldLookup::unresolved();
    };
    let segments = rewrite_keyed_segments(&node.id, &node.content_path(), resolved);
    let segments: Vec<&str> = segments.iter().map(SmolStr::as_str).collect();
    field_from_path(schema, document, &segments)
}

/// Walk a document type along already rewritten segments.
pub fn field_from_path<'a>(
    schema: &'a Schema,
    document: &'a DocumentSchema,
    segments: &[&str],
) -> FieldLookup<'a> {
    Walk { schema, hops: 0 }.step(Cursor::Document(document), segments, None)
}

/// Replace each keyed segment with its field name and resolved member type.
///
/// The lookup key for a keyed segment is the raw path up to and including it,
/// which for a top-level array is just the segment itself.
pub fn rewrite_keyed_segments(
    document_id: &str,
    path: &ContentPath,
    resolved: &ResolvedTypeTable,
) -> Vec<SmolStr> {
    let mut out = Vec::with_capacity(path.len() + 1);
    for (idx, segment) in path.segments().iter().enumerate() {
        if is_keyed_segment(segment) {
            let key = path.prefix(idx + 1);
            let member = resolved
                .get(document_id, &key)
                .cloned()
                .unwrap_or_default();
            out.push(SmolStr::new(segment_name(segment)));
            out.push(member);
        } else {
            out.push(segment.clone());
        }
    }
    out
}

#[derive(Clone, Copy)]
enum Cursor<'a> {
    Document(&'a DocumentSchema),
    Node(&'a SchemaNode),
    ArrayMember(&'a ArrayMember),
    ArrayItem(&'a ArrayItem),
    Union(&'a UnionNode),
    UnionMember(&'a UnionMember),
}

struct Walk<'a> {
    schema: &'a Schema,
    hops: usize,
}

impl<'a> Walk<'a> {
    fn step(
        &mut self,
        cursor: Cursor<'a>,
        path: &[&str],
        parent: Option<ParentRef<'a>>,
    ) -> FieldLookup<'a> {
        match cursor {
            Cursor::Document(doc) => {
                self.fields(&doc.fields, ParentRef::Document(doc), path, parent)
            }
            Cursor::Node(node) => match node {
                SchemaNode::Object(object) => {
                    self.fields(&object.fields, ParentRef::Object(object), path, parent)
                }
                SchemaNode::Array(array) => {
                    self.step(Cursor::ArrayMember(&array.of), path, Some(ParentRef::Array(array)))
                }
                SchemaNode::Union(union) => self.step(Cursor::Union(union), path, parent),
                SchemaNode::Inline(inline) => {
                    self.hops += 1;
                    if self.hops > MAX_INLINE_HOPS {
                        tracing::warn!(name = %inline.name, "inline reference chain too deep");
                        return FieldLookup::unresolved();
                    }
                    match self.schema.get(&inline.name) {
                        Some(SchemaType::Type(ty)) => self.step(Cursor::Node(&ty.value), path, parent),
                        Some(SchemaType::Document(doc)) => {
                            self.step(Cursor::Document(doc), path, parent)
                        }
                        None => FieldLookup::unresolved(),
                    }
                }
                _ => FieldLookup::unresolved(),
            },
            Cursor::ArrayMember(member) => match member {
                ArrayMember::ArrayItem(item) => self.step(Cursor::ArrayItem(item), path, parent),
                ArrayMember::Union(union) => self.step(Cursor::Union(union), path, parent),
            },
            Cursor::ArrayItem(item) => {
                let Some((_, rest)) = path.split_first() else {
                    return FieldLookup::unresolved();
                };
                if rest.is_empty() {
                    return FieldLookup {
                        field: Some(FieldRef::ArrayItem(item)),
                        parent,
                    };
                }
                self.step(Cursor::Node(&item.value), rest, Some(ParentRef::ArrayItem(item)))
            }
            Cursor::Union(union) => {
                let Some((next, rest)) = path.split_first() else {
                    return FieldLookup::unresolved();
                };
                match union.member_for(next) {
                    Some(member) => {
                        self.step(Cursor::UnionMember(member), rest, Some(ParentRef::Union(union)))
                    }
                    None => FieldLookup::unresolved(),
                }
            }
            Cursor::UnionMember(member) => match member {
                UnionMember::UnionOption(option) if path.is_empty() => FieldLookup {
                    field: Some(FieldRef::UnionOption(option)),
                    parent,
                },
                UnionMember::UnionOption(option) => self.step(
                    Cursor::Node(&option.value),
                    path,
                    Some(ParentRef::UnionOption(option)),
                ),
                UnionMember::String(_) | UnionMember::Number(_) => FieldLookup::unresolved(),
            },
        }
    }

    fn fields(
        &mut self,
        fields: &'a std::collections::BTreeMap<SmolStr, ObjectField>,
        this: ParentRef<'a>,
        path: &[&str],
        parent: Option<ParentRef<'a>>,
    ) -> FieldLookup<'a> {
        let Some((next, rest)) = path.split_first() else {
            return FieldLookup::unresolved();
        };
        let Some(field) = fields.get(*next) else {
            return FieldLookup::unresolved();
        };
        if rest.is_empty() {
            return FieldLookup {
                field: Some(FieldRef::ObjectField(field)),
                parent,
            };
        }
        self.step(Cursor::Node(&field.value), rest, Some(this))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::ResolvedNode;

    fn schema() -> Schema {
        serde_json::from_str(
            r#"[
            {"type": "document", "name": "page", "fields": {
                "title": {"type": "objectField", "name": "title", "value": {"type": "string"}},
                "seo": {"type": "objectField", "name": "seo", "value": {"type": "inline", "name": "seo"}},
                "items": {"type": "objectField", "name": "items", "title": "Items", "value": {
                    "type": "array",
                    "of": {"type": "union", "of": [
                        {"type": "unionOption", "name": "featureHighlight", "title": "Feature", "value": {
                            "type": "object", "fields": {
                                "title": {"type": "objectField", "name": "title", "title": "Title", "value": {"type": "string"}}
                            }
                        }},
                        {"type": "unionOption", "name": "hero", "value": {"type": "inline", "name": "hero"}}
                    ]}
                }},
                "tags": {"type": "objectField", "name": "tags", "value": {
                    "type": "array",
                    "of": {"type": "arrayItem", "name": "tag", "value": {"type": "object", "fields": {
                        "label": {"type": "objectField", "name": "label", "value": {"type": "string"}}
                    }}}
                }},
                "size": {"type": "objectField", "name": "size", "value": {
                    "type": "union", "of": [{"type": "string", "value": "s"}, {"type": "string", "value": "m"}]
                }}
            }},
            {"type": "type", "name": "seo", "value": {"type": "object", "fields": {
                "description": {"type": "objectField", "name": "description", "value": {"type": "string"}}
            }}},
            {"type": "type", "name": "hero", "value": {"type": "object", "fields": {
                "headline": {"type": "objectField", "name": "headline", "value": {"type": "string"}}
            }}},
            {"type": "type", "name": "loop", "value": {"type": "inline", "name": "loop"}}
        ]"#,
        )
        .unwrap()
    }

    fn node(path: &str) -> SanityNode {
        SanityNode::Resolved(ResolvedNode {
            id: "home".into(),
            type_name: Some("page".into()),
            path: path.into(),
            project_id: None,
            dataset: None,
            base_url: "/studio".into(),
            tool: None,
            workspace: None,
            is_draft: None,
        })
    }

    #[test]
    fn test_schema_type_by_name() {
        let schema = schema();
        assert_eq!(get_schema_type(&node("title"), &schema).map(|d| d.name.as_str()), Some("page"));

        let stega = SanityNode::Stega(crate::node::StegaNode {
            href: "/".into(),
            data: None,
        });
        assert!(get_schema_type(&stega, &schema).is_none());
    }

    #[test]
    fn test_top_level_field() {
        let schema = schema();
        let doc = schema.document("page").unwrap();
        let lookup = get_field(&node("title"), doc, &schema, &ResolvedTypeTable::new());
        assert_eq!(lookup.field.map(|f| f.name()), Some("title"));
        assert_eq!(lookup.parent, None);
    }

    #[test]
    fn test_inline_type_is_followed() {
        let schema = schema();
        let doc = schema.document("page").unwrap();
        let lookup = get_field(&node("seo.description"), doc, &schema, &ResolvedTypeTable::new());
        assert_eq!(lookup.field.map(|f| f.name()), Some("description"));
        assert!(matches!(lookup.parent, Some(ParentRef::Document(_))));
    }

    #[test]
    fn test_keyed_segment_waits_for_resolution() {
        let schema = schema();
        let doc = schema.document("page").unwrap();
        let element = node(r#"items[_key=="x"].title"#);

        let mut table = ResolvedTypeTable::new();
        assert!(!get_field(&element, doc, &schema, &table).is_resolved());

        table.insert("home", r#"items[_key=="x"]"#, "featureHighlight");
        let lookup = get_field(&element, doc, &schema, &table);
        let field = lookup.field.unwrap();
        assert_eq!(field.name(), "title");
        assert_eq!(field.label(), "Title");
        assert!(matches!(
            lookup.parent,
            Some(ParentRef::UnionOption(opt)) if opt.name == "featureHighlight"
        ));
    }

    #[test]
    fn test_keyed_item_itself_has_union_parent() {
        let schema = schema();
        let doc = schema.document("page").unwrap();
        let mut table = ResolvedTypeTable::new();
        table.insert("home", r#"items[_key=="x"]"#, "hero");

        let lookup = get_field(&node(r#"items[_key=="x"]"#), doc, &schema, &table);
        assert!(matches!(lookup.field, Some(FieldRef::UnionOption(opt)) if opt.name == "hero"));
        assert!(lookup.parent.and_then(|p| p.as_union()).is_some());

        let lookup = get_field(&node(r#"items[_key=="x"].headline"#), doc, &schema, &table);
        assert_eq!(lookup.field.map(|f| f.name()), Some("headline"));
    }

    #[test]
    fn test_array_item_member() {
        let schema = schema();
        let doc = schema.document("page").unwrap();
        let mut table = ResolvedTypeTable::new();
        table.insert("home", r#"tags[_key=="t"]"#, "tag");

        let lookup = get_field(&node(r#"tags[_key=="t"].label"#), doc, &schema, &table);
        assert_eq!(lookup.field.map(|f| f.name()), Some("label"));
        assert!(matches!(lookup.parent, Some(ParentRef::ArrayItem(_))));

        let lookup = get_field(&node(r#"tags[_key=="t"]"#), doc, &schema, &table);
        assert!(matches!(lookup.field, Some(FieldRef::ArrayItem(item)) if item.name == "tag"));
    }

    #[test]
    fn test_unknown_and_primitive_paths_are_unresolved() {
        let schema = schema();
        let doc = schema.document("page").unwrap();
        let table = ResolvedTypeTable::new();
        for path in ["missing", "title.deeper", "size.s", ""] {
            assert!(
                !get_field(&node(path), doc, &schema, &table).is_resolved(),
                "{path} should not resolve"
            );
        }
    }

    #[test]
    fn test_inline_cycle_is_bounded() {
        let schema = schema();
        let page = schema.document("page").unwrap();
        let looping = DocumentSchema {
            name: "looping".into(),
            title: None,
            icon: None,
            fields: [(
                SmolStr::new("x"),
                ObjectField {
                    name: "x".into(),
                    title: None,
                    value: SchemaNode::Inline(crate::schema::InlineNode { name: "loop".into() }),
                    optional: false,
                },
            )]
            .into_iter()
            .collect(),
        };
        assert!(!field_from_path(&schema, &looping, &["x", "y"]).is_resolved());
        // Unaffected walks still work afterwards.
        assert!(field_from_path(&schema, page, &["title"]).is_resolved());
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let schema = schema();
        let doc = schema.document("page").unwrap();
        let mut table = ResolvedTypeTable::new();
        table.insert("home", r#"items[_key=="x"]"#, "featureHighlight");
        let element = node(r#"items[_key=="x"].title"#);
        assert_eq!(
            get_field(&element, doc, &schema, &table),
            get_field(&element, doc, &schema, &table)
        );
    }

    #[test]
    fn test_nested_keyed_prefix_keys() {
        let path = ContentPath::parse(r#"a[_key=="x"].b[_key=="y"].c"#);
        let mut table = ResolvedTypeTable::new();
        table.insert("doc", r#"a[_key=="x"]"#, "outer");
        table.insert("doc", r#"a[_key=="x"].b[_key=="y"]"#, "inner");
        let rewritten = rewrite_keyed_segments("doc", &path, &table);
        assert_eq!(rewritten, ["a", "outer", "b", "inner", "c"]);
    }
}
