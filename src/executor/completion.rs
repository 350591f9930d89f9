use std::{mem, sync::Arc};

use arcstr::ArcStr;
use indexmap::IndexMap;

use crate::{
    ast::Type,
    executor::{
        ExecutionPools, Executor, FieldError, FieldKind, FieldSelection, ParentValue,
        ResolutionUnit, SharedAny, path::Path, pool::Pooled,
    },
    schema::meta::{EnumMeta, MetaType, ObjectMeta, ScalarMeta},
    types::FieldValue,
    value::{Object, ScalarValue, Value},
};

type NodeId = usize;

/// Position of a value in the [`ResultTree`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct SlotRef {
    node: NodeId,
    index: usize,
}

#[derive(Debug)]
enum SlotValue {
    Pending,
    Leaf(Value),
    Node(NodeId),
}

#[derive(Debug)]
pub(crate) struct Slot {
    value: SlotValue,
    non_null: bool,
}

impl Slot {
    fn pending(non_null: bool) -> Self {
        Self {
            value: SlotValue::Pending,
            non_null,
        }
    }
}

/// Object or list of the response, linked to the slot holding it.
#[derive(Debug)]
pub(crate) enum Node {
    Object {
        fields: IndexMap<ArcStr, Slot>,
        parent: Option<SlotRef>,
    },
    List {
        items: Vec<Slot>,
        parent: Option<SlotRef>,
    },
}

impl Node {
    fn parent(&self) -> Option<SlotRef> {
        match self {
            Self::Object { parent, .. } | Self::List { parent, .. } => *parent,
        }
    }

    fn slot_mut(&mut self, index: usize) -> Option<&mut Slot> {
        match self {
            Self::Object { fields, .. } => fields.get_index_mut(index).map(|(_, s)| s),
            Self::List { items, .. } => items.get_mut(index),
        }
    }
}

/// Response being built by an execution.
///
/// Slots are created in selection order when their enclosing object is
/// completed, so the response keeps the query's field order whatever order
/// the resolvers finish in.
pub(crate) struct ResultTree {
    nodes: Pooled<'static, Vec<Node>>,
    data_nulled: bool,
}

impl ResultTree {
    pub(crate) const ROOT: NodeId = 0;

    pub(crate) fn new() -> Self {
        let mut nodes = ExecutionPools::shared().nodes.rent();
        nodes.push(Node::Object {
            fields: IndexMap::new(),
            parent: None,
        });
        Self {
            nodes,
            data_nulled: false,
        }
    }

    /// Appends a pending field to an object node.
    pub(crate) fn add_field(&mut self, node: NodeId, key: ArcStr, non_null: bool) -> SlotRef {
        let index = match &mut self.nodes[node] {
            Node::Object { fields, .. } => fields.insert_full(key, Slot::pending(non_null)).0,
            Node::List { items, .. } => {
                items.push(Slot::pending(non_null));
                items.len() - 1
            }
        };
        SlotRef { node, index }
    }

    /// Places a new object node into a slot.
    pub(crate) fn new_object(&mut self, slot: SlotRef, capacity: usize) -> NodeId {
        self.attach(
            slot,
            Node::Object {
                fields: IndexMap::with_capacity(capacity),
                parent: Some(slot),
            },
        )
    }

    /// Places a new list node of `len` pending items into a slot.
    pub(crate) fn new_list(&mut self, slot: SlotRef, len: usize, non_null_items: bool) -> NodeId {
        self.attach(
            slot,
            Node::List {
                items: (0..len).map(|_| Slot::pending(non_null_items)).collect(),
                parent: Some(slot),
            },
        )
    }

    fn attach(&mut self, slot: SlotRef, node: Node) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(node);
        if let Some(s) = self.slot_mut(slot) {
            s.value = SlotValue::Node(id);
        }
        id
    }

    pub(crate) fn set_leaf(&mut self, slot: SlotRef, value: Value) {
        if value.is_null() {
            self.set_null(slot);
        } else if let Some(s) = self.slot_mut(slot) {
            s.value = SlotValue::Leaf(value);
        }
    }

    /// Nulls a slot, then each enclosing slot up to the nearest nullable one.
    ///
    /// Reaching the root nulls the whole `data` entry.
    pub(crate) fn set_null(&mut self, slot: SlotRef) {
        let mut current = slot;
        loop {
            let Some(s) = self.slot_mut(current) else {
                return;
            };
            if matches!(s.value, SlotValue::Leaf(Value::Null)) {
                return;
            }
            s.value = SlotValue::Leaf(Value::Null);
            if !s.non_null {
                return;
            }
            match self.nodes[current.node].parent() {
                Some(parent) => current = parent,
                None => {
                    self.data_nulled = true;
                    return;
                }
            }
        }
    }

    fn slot_mut(&mut self, slot: SlotRef) -> Option<&mut Slot> {
        self.nodes.get_mut(slot.node)?.slot_mut(slot.index)
    }

    /// Whether a null reached the root of the response.
    pub(crate) fn is_data_nulled(&self) -> bool {
        self.data_nulled
    }

    /// Builds the `data` entry of the response. Fields never completed are
    /// `null`.
    pub(crate) fn into_value(mut self) -> Value {
        if self.data_nulled {
            return Value::Null;
        }
        take_node(&mut self.nodes, Self::ROOT)
    }
}

fn take_node(nodes: &mut [Node], id: NodeId) -> Value {
    match &mut nodes[id] {
        Node::Object { fields, .. } => {
            let fields = mem::take(fields);
            let mut object = Object::with_capacity(fields.len());
            for (key, slot) in fields {
                object.add_field(key.as_str(), take_slot(nodes, slot));
            }
            Value::Object(object)
        }
        Node::List { items, .. } => {
            let items = mem::take(items);
            Value::List(items.into_iter().map(|s| take_slot(nodes, s)).collect())
        }
    }
}

fn take_slot(nodes: &mut [Node], slot: Slot) -> Value {
    match slot.value {
        SlotValue::Pending => Value::Null,
        SlotValue::Leaf(v) => v,
        SlotValue::Node(id) => take_node(nodes, id),
    }
}

/// Where completion writes: the response and the units of the next wave.
pub(crate) struct Output<'t, 'a> {
    pub(crate) tree: &'t mut ResultTree,
    pub(crate) next: &'t mut Vec<ResolutionUnit<'a>>,
}

/// The field a value is completed for.
struct Site<'s, 'a> {
    selection: &'s Arc<FieldSelection<'a>>,
    object_type: &'a ObjectMeta,
    parent: &'s ParentValue,
}

impl Site<'_, '_> {
    fn field_name(&self) -> String {
        format!("{}.{}", self.object_type.name, self.selection.field_name)
    }
}

impl<'a> Executor<'a> {
    /// Writes the fields of `object` into a node, resolving `__typename` and
    /// unknown fields in place and enqueueing a unit for every other field.
    pub(crate) fn enqueue_fields(
        &self,
        out: &mut Output<'_, 'a>,
        node: NodeId,
        object: &'a ObjectMeta,
        fields: &[Arc<FieldSelection<'a>>],
        path: &Path,
        parent: &ParentValue,
    ) {
        let tree = &mut *out.tree;
        for selection in fields {
            let key = selection.response_key.clone();
            match selection.kind {
                FieldKind::Typename => {
                    let slot = tree.add_field(node, key, true);
                    tree.set_leaf(slot, Value::scalar(object.name.as_str()));
                }
                FieldKind::Unknown => {
                    let slot = tree.add_field(node, key.clone(), false);
                    self.push_error_at(
                        FieldError::from(format!(
                            "Unknown field \"{}\" on type \"{}\"",
                            selection.field_name, object.name,
                        )),
                        &path.field(key),
                        selection.position,
                    );
                    tree.set_null(slot);
                }
                FieldKind::Schema(field) => {
                    let slot = tree.add_field(node, key.clone(), field.field_type.is_non_null());
                    out.next.push(ResolutionUnit {
                        path: path.field(key),
                        selection: selection.clone(),
                        field,
                        object_type: object,
                        parent: parent.clone(),
                        arguments: None,
                        slot,
                    });
                }
            }
        }
    }

    /// Completes the resolver result of a unit into its slot.
    pub(crate) fn complete_unit(
        &self,
        out: &mut Output<'_, 'a>,
        unit: ResolutionUnit<'a>,
        result: Result<FieldValue, FieldError>,
    ) {
        let ResolutionUnit {
            path,
            selection,
            field,
            object_type,
            parent,
            slot,
            ..
        } = unit;
        let site = Site {
            selection: &selection,
            object_type,
            parent: &parent,
        };
        let value = result.unwrap_or_else(FieldValue::Error);
        self.complete_value(out, &site, slot, &field.field_type, value, &path);
    }

    /// Nulls the slot of a unit that will not be resolved.
    pub(crate) fn abandon_unit(
        &self,
        tree: &mut ResultTree,
        unit: ResolutionUnit<'a>,
        error: FieldError,
    ) {
        self.push_error_at(error, &unit.path, unit.selection.position);
        tree.set_null(unit.slot);
    }

    fn fail(
        &self,
        tree: &mut ResultTree,
        site: &Site<'_, 'a>,
        slot: SlotRef,
        path: &Path,
        error: FieldError,
    ) {
        self.push_error_at(error, path, site.selection.position);
        tree.set_null(slot);
    }

    fn complete_value(
        &self,
        out: &mut Output<'_, 'a>,
        site: &Site<'_, 'a>,
        slot: SlotRef,
        ty: &'a Type,
        value: FieldValue,
        path: &Path,
    ) {
        if let FieldValue::Error(e) = value {
            return self.fail(out.tree, site, slot, path, e);
        }
        if value.is_null() {
            if ty.is_non_null() {
                let e = format!("Cannot return null for non-nullable field {}.", site.field_name());
                return self.fail(out.tree, site, slot, path, e.into());
            }
            return out.tree.set_null(slot);
        }

        if let Some(item_type) = ty.list_item() {
            let items = match value {
                FieldValue::List(items) => items,
                FieldValue::Value(Value::List(items)) => {
                    items.into_iter().map(FieldValue::Value).collect()
                }
                other => {
                    let e = format!(
                        "Expected a list for field {}, found {other:?}",
                        site.field_name(),
                    );
                    return self.fail(out.tree, site, slot, path, e.into());
                }
            };
            let node = out.tree.new_list(slot, items.len(), item_type.is_non_null());
            for (index, item) in items.into_iter().enumerate() {
                self.complete_value(
                    out,
                    site,
                    SlotRef { node, index },
                    item_type,
                    item,
                    &path.index(index),
                );
            }
            return;
        }

        let Some(meta) = self.schema.innermost_type(ty) else {
            let e = format!("Unknown type \"{ty}\" of field {}", site.field_name());
            return self.fail(out.tree, site, slot, path, e.into());
        };
        match meta {
            MetaType::Scalar(scalar) => match complete_scalar(scalar, value) {
                Ok(v) => out.tree.set_leaf(slot, v),
                Err(e) => self.fail(out.tree, site, slot, path, e.into()),
            },
            MetaType::Enum(enum_meta) => match complete_enum(enum_meta, value) {
                Ok(v) => out.tree.set_leaf(slot, v),
                Err(e) => self.fail(out.tree, site, slot, path, e.into()),
            },
            MetaType::Object(_) | MetaType::Interface(_) | MetaType::Union(_) => {
                self.complete_object(out, site, slot, meta, value, path);
            }
            MetaType::InputObject(_) => {
                let e = format!("Field {} cannot return an input object", site.field_name());
                self.fail(out.tree, site, slot, path, e.into());
            }
        }
    }

    fn complete_object(
        &self,
        out: &mut Output<'_, 'a>,
        site: &Site<'_, 'a>,
        slot: SlotRef,
        declared: &'a MetaType,
        value: FieldValue,
        path: &Path,
    ) {
        let (type_name, value) = match value {
            FieldValue::Typed { type_name, value } => (Some(type_name), *value),
            v => (None, v),
        };
        let parent: SharedAny = match value {
            FieldValue::Object(o) => o,
            FieldValue::Value(v @ Value::Object(_)) => Arc::new(v),
            other => {
                let e = format!(
                    "Expected an object for field {}, found {other:?}",
                    site.field_name(),
                );
                return self.fail(out.tree, site, slot, path, e.into());
            }
        };

        let object = match self.runtime_type(declared, type_name, &parent) {
            Ok(o) => o,
            Err(e) => return self.fail(out.tree, site, slot, path, e),
        };

        let fields = self
            .collector
            .collect(object, &site.selection.selection_sets());
        let node = out.tree.new_object(slot, fields.len());
        let parent = site.parent.push(parent);
        self.enqueue_fields(out, node, object, &fields, path, &parent);
    }

    /// Concrete object type of a composite value.
    fn runtime_type(
        &self,
        declared: &'a MetaType,
        type_name: Option<ArcStr>,
        value: &SharedAny,
    ) -> Result<&'a ObjectMeta, FieldError> {
        if let MetaType::Object(o) = declared {
            return match type_name {
                Some(n) if n != o.name => Err(format!(
                    "Runtime Object type \"{n}\" is not a possible type for \"{}\".",
                    o.name,
                )
                .into()),
                _ => Ok(o),
            };
        }

        let name = type_name
            .or_else(|| declared.type_resolver()?.resolve(&**value))
            .or_else(|| {
                let typename = (**value)
                    .downcast_ref::<Value>()?
                    .as_object_value()?
                    .get_field_value("__typename")?
                    .as_string_value()?;
                Some(typename.into())
            })
            .ok_or_else(|| {
                FieldError::from(format!(
                    "Abstract type \"{0}\" must resolve to an Object type at runtime. \
                     Either the \"{0}\" type should provide a type resolver or each \
                     value should be tagged with its type name.",
                    declared.name(),
                ))
            })?;

        match self.schema.object_by_name(&name) {
            Some(o) if self.schema.is_possible_type(declared, &name) => Ok(o),
            _ => Err(format!(
                "Runtime Object type \"{name}\" is not a possible type for \"{}\".",
                declared.name(),
            )
            .into()),
        }
    }
}

fn leaf_value(value: FieldValue) -> Result<Value, String> {
    match value {
        FieldValue::Value(v) => Ok(v),
        FieldValue::Typed { value, .. } => leaf_value(*value),
        FieldValue::Object(o) => o
            .downcast_ref::<Value>()
            .cloned()
            .ok_or_else(|| "Expected a leaf value, found an opaque object".to_owned()),
        other => Err(format!("Expected a leaf value, found {other:?}")),
    }
}

/// Serializes a resolved value as a scalar of the given type.
///
/// Custom scalars accept any value.
fn complete_scalar(scalar: &ScalarMeta, value: FieldValue) -> Result<Value, String> {
    let value = leaf_value(value)?;
    let Value::Scalar(s) = &value else {
        return match scalar.name.as_str() {
            "Int" | "Float" | "String" | "Boolean" | "ID" => {
                Err(format!("{} cannot represent a non-scalar value: {value}", scalar.name))
            }
            _ => Ok(value),
        };
    };

    let coerced = match (scalar.name.as_str(), s) {
        ("Int", ScalarValue::Int(_))
        | ("Float", ScalarValue::Float(_))
        | ("String" | "ID", ScalarValue::String(_))
        | ("Boolean", ScalarValue::Boolean(_)) => return Ok(value),
        ("Int", ScalarValue::Float(f))
            if f.fract() == 0.0 && *f >= f64::from(i32::MIN) && *f <= f64::from(i32::MAX) =>
        {
            ScalarValue::Int(*f as i32)
        }
        ("Float", ScalarValue::Int(i)) => ScalarValue::Float(f64::from(*i)),
        ("ID", ScalarValue::Int(i)) => ScalarValue::String(i.to_string()),
        ("String", ScalarValue::Int(i)) => ScalarValue::String(i.to_string()),
        ("String", ScalarValue::Float(f)) => ScalarValue::String(f.to_string()),
        ("String", ScalarValue::Boolean(b)) => ScalarValue::String(b.to_string()),
        ("Int" | "Float" | "Boolean" | "ID", _) => {
            return Err(format!("{} cannot represent value: {s}", scalar.name));
        }
        _ => return Ok(value),
    };
    Ok(Value::Scalar(coerced))
}

fn complete_enum(meta: &EnumMeta, value: FieldValue) -> Result<Value, String> {
    let value = leaf_value(value)?;
    match value.as_string_value() {
        Some(name) if meta.values.iter().any(|v| v.name.as_str() == name) => Ok(value),
        _ => Err(format!("Enum \"{}\" cannot represent value: {value}", meta.name)),
    }
}
