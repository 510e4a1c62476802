use crate::{error::Error, value::Value};
use serde::Serialize;
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    fmt,
    rc::Rc,
};

/// Rich metadata sequences every rich enum carries, extended in lock-step
/// with the member list whenever a rich target is patched.
pub const RICH_BASE_ATTRS: &[&str] = &["titles", "css_classes"];

///
/// EnumMember
///
/// One named member of an enumeration.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct EnumMember {
    pub name: String,
    pub value: i64,
}

struct EnumInner {
    name: String,
    rich: bool,
    members: Vec<EnumMember>,
    rich_values: BTreeMap<String, Vec<Option<Value>>>,
    attrs: BTreeMap<String, Value>,
}

///
/// Enum
///
/// A closed, already-finalized enumeration that nevertheless supports
/// dynamic extension: members in declaration order, an optional "rich"
/// capability with per-member metadata sequences parallel to the member
/// order, and plain class-level attributes.
///

#[derive(Clone)]
pub struct Enum(Rc<RefCell<EnumInner>>);

impl Enum {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> EnumBuilder {
        EnumBuilder {
            name: name.into(),
            rich: false,
            members: Vec::new(),
            rich_values: BTreeMap::new(),
            attrs: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        self.0.borrow().name.clone()
    }

    /// Whether this enumeration opted into rich per-member metadata.
    #[must_use]
    pub fn is_rich(&self) -> bool {
        self.0.borrow().rich
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.borrow().members.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.borrow().members.is_empty()
    }

    /// Members in declaration order.
    #[must_use]
    pub fn members(&self) -> Vec<EnumMember> {
        self.0.borrow().members.clone()
    }

    /// Value of the member named `name`, if defined.
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<i64> {
        self.0
            .borrow()
            .members
            .iter()
            .find(|member| member.name == name)
            .map(|member| member.value)
    }

    /// First member carrying `value`, if any.
    #[must_use]
    pub fn from_value(&self, value: i64) -> Option<EnumMember> {
        self.0
            .borrow()
            .members
            .iter()
            .find(|member| member.value == value)
            .cloned()
    }

    /// Rich metadata sequence under `attr`, if this enum exposes one.
    #[must_use]
    pub fn rich_values(&self, attr: &str) -> Option<Vec<Option<Value>>> {
        self.0.borrow().rich_values.get(attr).cloned()
    }

    /// Plain class-level attribute.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<Value> {
        self.0.borrow().attrs.get(name).cloned()
    }

    /// Append a member; the name must not already be defined.
    pub fn add_member(&self, name: impl Into<String>, value: i64) -> Result<(), Error> {
        let name = name.into();
        let mut inner = self.0.borrow_mut();
        if inner.members.iter().any(|member| member.name == name) {
            return Err(Error::DuplicateEnumMember {
                target: inner.name.clone(),
                name,
            });
        }
        inner.members.push(EnumMember { name, value });
        Ok(())
    }

    /// Serializable introspection snapshot.
    #[must_use]
    pub fn report(&self) -> EnumReport {
        let inner = self.0.borrow();
        EnumReport {
            name: inner.name.clone(),
            rich: inner.rich,
            members: inner.members.clone(),
            rich_values: inner.rich_values.clone(),
            attrs: inner.attrs.clone(),
        }
    }

    fn set_attr(&self, name: impl Into<String>, value: Value) {
        self.0.borrow_mut().attrs.insert(name.into(), value);
    }

    fn extend_rich_values(&self, attr: &str, padding: i64, extension: &[Option<Value>]) {
        let mut inner = self.0.borrow_mut();
        let Some(values) = inner.rich_values.get_mut(attr) else {
            return;
        };
        // Fill the gap between the current length and the padded start
        // position; zero placeholders if the sequence already reaches it.
        let start = usize::try_from(padding).unwrap_or(0);
        if start > values.len() {
            values.resize(start, None);
        }
        values.extend(extension.iter().cloned());
    }
}

impl fmt::Debug for Enum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.0.borrow();
        write!(f, "Enum({}, {} members)", inner.name, inner.members.len())
    }
}

///
/// EnumBuilder
///

pub struct EnumBuilder {
    name: String,
    rich: bool,
    members: Vec<EnumMember>,
    rich_values: BTreeMap<String, Vec<Option<Value>>>,
    attrs: BTreeMap<String, Value>,
}

impl EnumBuilder {
    #[must_use]
    pub fn member(mut self, name: impl Into<String>, value: i64) -> Self {
        self.members.push(EnumMember {
            name: name.into(),
            value,
        });
        self
    }

    /// Opt into rich per-member metadata.
    #[must_use]
    pub const fn rich(mut self) -> Self {
        self.rich = true;
        self
    }

    /// Declare a rich metadata sequence. Implies `rich`.
    #[must_use]
    pub fn rich_values(mut self, attr: impl Into<String>, values: Vec<Option<Value>>) -> Self {
        self.rich = true;
        self.rich_values.insert(attr.into(), values);
        self
    }

    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Enum {
        Enum(Rc::new(RefCell::new(EnumInner {
            name: self.name,
            rich: self.rich,
            members: self.members,
            rich_values: self.rich_values,
            attrs: self.attrs,
        })))
    }
}

///
/// EnumPatchOptions
///
/// `padding` shifts every patched member's value to reserve a range the
/// target's own future members will not collide with — a manual
/// versioning convention, not auto-negotiated. `extra_attrs` are copied
/// verbatim; `rich_attrs` name additional per-member metadata sequences
/// to extend in lock-step (rich targets only).
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct EnumPatchOptions {
    pub padding: i64,
    pub extra_attrs: Vec<String>,
    pub rich_attrs: Vec<String>,
}

impl EnumPatchOptions {
    #[must_use]
    pub const fn with_padding(mut self, padding: i64) -> Self {
        self.padding = padding;
        self
    }

    #[must_use]
    pub fn with_extra_attr(mut self, attr: impl Into<String>) -> Self {
        self.extra_attrs.push(attr.into());
        self
    }

    #[must_use]
    pub fn with_rich_attr(mut self, attr: impl Into<String>) -> Self {
        self.rich_attrs.push(attr.into());
        self
    }
}

///
/// Enum Patch Engine
///
/// Two-stage application mirroring the class engine: `patch_enum`
/// validates target and options before any mutation, `apply` extends the
/// target with the patch enumeration.
///

pub fn patch_enum(target: &Enum, options: EnumPatchOptions) -> Result<EnumPatch, Error> {
    if options.padding < 0 {
        return Err(Error::NegativePadding(options.padding));
    }
    if !options.rich_attrs.is_empty() && !target.is_rich() {
        return Err(Error::NotRichEnum(target.name()));
    }

    // Rich sequences to extend: the implicit base set plus any requested.
    let mut rich_attrs = BTreeSet::new();
    if target.is_rich() {
        rich_attrs.extend(RICH_BASE_ATTRS.iter().map(ToString::to_string));
        rich_attrs.extend(options.rich_attrs.iter().cloned());
    }

    // An extra attribute must not shadow a rich one, nor vice versa.
    if let Some(collision) = options
        .extra_attrs
        .iter()
        .find(|attr| rich_attrs.contains(*attr))
    {
        return Err(Error::RichAttrCollision(collision.clone()));
    }

    Ok(EnumPatch {
        target: target.clone(),
        padding: options.padding,
        extra_attrs: options.extra_attrs,
        rich_attrs: rich_attrs.into_iter().collect(),
    })
}

///
/// EnumPatch
///
/// Second stage of enum patching, bound to a validated target. Member,
/// rich, and extra extension run in that order and are not transactional:
/// a mid-apply failure can leave the target partially extended.
///

#[derive(Debug)]
pub struct EnumPatch {
    target: Enum,
    padding: i64,
    extra_attrs: Vec<String>,
    rich_attrs: Vec<String>,
}

impl EnumPatch {
    #[must_use]
    pub const fn target(&self) -> &Enum {
        &self.target
    }

    pub fn apply(&self, patch: &Enum) -> Result<(), Error> {
        // Members first, in declaration order, value-shifted by padding.
        // Padded values are computed up front so an overflow rejects the
        // whole member batch before any of it lands on the target.
        let mut padded = Vec::new();
        for member in patch.members() {
            let value = member.value.checked_add(self.padding).ok_or_else(|| {
                Error::PaddingOverflow {
                    name: member.name.clone(),
                    padding: self.padding,
                }
            })?;
            padded.push((member.name, value));
        }
        for (name, value) in padded {
            self.target.add_member(name, value)?;
        }

        // Rich sequences extend only when both sides expose them.
        for attr in &self.rich_attrs {
            if let Some(extension) = patch.rich_values(attr) {
                self.target.extend_rich_values(attr, self.padding, &extension);
            }
        }

        // Plain extras overwrite; a missing source attribute is an error.
        for attr in &self.extra_attrs {
            let value = patch
                .attr(attr)
                .ok_or_else(|| Error::not_found(patch.name(), attr))?;
            self.target.set_attr(attr, value);
        }

        Ok(())
    }
}

///
/// EnumReport
///

#[derive(Clone, Debug, Serialize)]
pub struct EnumReport {
    pub name: String,
    pub rich: bool,
    pub members: Vec<EnumMember>,
    pub rich_values: BTreeMap<String, Vec<Option<Value>>>,
    pub attrs: BTreeMap<String, Value>,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Enum {
        Enum::builder("Season").member("a", 0).member("b", 1).build()
    }

    fn patch() -> Enum {
        Enum::builder("SeasonPatch").member("c", 0).member("d", 1).build()
    }

    #[test]
    fn members_extend_without_padding() {
        let season = target();
        patch_enum(&season, EnumPatchOptions::default())
            .unwrap()
            .apply(&patch())
            .unwrap();

        let members: Vec<(String, i64)> = season
            .members()
            .into_iter()
            .map(|m| (m.name, m.value))
            .collect();
        assert_eq!(
            members,
            vec![
                ("a".to_string(), 0),
                ("b".to_string(), 1),
                ("c".to_string(), 0),
                ("d".to_string(), 1),
            ]
        );
    }

    #[test]
    fn padding_shifts_patch_values() {
        let season = target();
        patch_enum(&season, EnumPatchOptions::default().with_padding(22))
            .unwrap()
            .apply(&patch())
            .unwrap();

        assert_eq!(season.value_of("c"), Some(22));
        assert_eq!(season.value_of("d"), Some(23));
        assert_eq!(season.from_value(23).map(|m| m.name), Some("d".to_string()));
    }

    #[test]
    fn negative_padding_is_rejected_before_mutation() {
        let season = target();
        let err = patch_enum(&season, EnumPatchOptions::default().with_padding(-1)).unwrap_err();
        assert!(matches!(err, Error::NegativePadding(-1)));
        assert_eq!(season.len(), 2);
    }

    #[test]
    fn padded_value_overflow_rejects_the_member_batch() {
        let season = target();
        let patch = Enum::builder("Big").member("huge", i64::MAX).build();

        let err = patch_enum(&season, EnumPatchOptions::default().with_padding(1))
            .unwrap()
            .apply(&patch)
            .unwrap_err();

        assert!(matches!(err, Error::PaddingOverflow { name, .. } if name == "huge"));
        assert_eq!(season.len(), 2);
    }

    #[test]
    fn duplicate_member_names_are_rejected() {
        let season = target();
        let clashing = Enum::builder("Clash").member("b", 5).build();
        let err = patch_enum(&season, EnumPatchOptions::default())
            .unwrap()
            .apply(&clashing)
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEnumMember { name, .. } if name == "b"));
    }

    #[test]
    fn rich_titles_extend_with_gap_placeholders() {
        let season = Enum::builder("Season")
            .member("a", 0)
            .member("b", 1)
            .rich_values(
                "titles",
                vec![Some(Value::from("A")), Some(Value::from("B"))],
            )
            .build();
        let patch = Enum::builder("SeasonPatch")
            .member("c", 0)
            .member("d", 1)
            .rich_values(
                "titles",
                vec![Some(Value::from("C")), Some(Value::from("D"))],
            )
            .build();

        patch_enum(&season, EnumPatchOptions::default().with_padding(4))
            .unwrap()
            .apply(&patch)
            .unwrap();

        assert_eq!(
            season.rich_values("titles").unwrap(),
            vec![
                Some(Value::from("A")),
                Some(Value::from("B")),
                None,
                None,
                Some(Value::from("C")),
                Some(Value::from("D")),
            ]
        );
        // Padded member values line up with the concatenated titles.
        assert_eq!(season.value_of("c"), Some(4));
    }

    #[test]
    fn rich_extension_without_padding_concatenates() {
        let season = Enum::builder("Season")
            .member("a", 0)
            .rich_values("titles", vec![Some(Value::from("A"))])
            .build();
        let patch = Enum::builder("SeasonPatch")
            .member("b", 1)
            .rich_values("titles", vec![Some(Value::from("B"))])
            .build();

        patch_enum(&season, EnumPatchOptions::default())
            .unwrap()
            .apply(&patch)
            .unwrap();

        assert_eq!(
            season.rich_values("titles").unwrap(),
            vec![Some(Value::from("A")), Some(Value::from("B"))]
        );
    }

    #[test]
    fn rich_extension_skipped_when_either_side_lacks_the_attr() {
        let season = Enum::builder("Season")
            .member("a", 0)
            .rich_values("titles", vec![Some(Value::from("A"))])
            .build();
        // Patch carries no titles: the target's sequence is untouched.
        let patch = Enum::builder("SeasonPatch").member("b", 1).build();

        patch_enum(&season, EnumPatchOptions::default())
            .unwrap()
            .apply(&patch)
            .unwrap();

        assert_eq!(
            season.rich_values("titles").unwrap(),
            vec![Some(Value::from("A"))]
        );
    }

    #[test]
    fn rich_attrs_require_a_rich_target() {
        let season = target();
        let err = patch_enum(
            &season,
            EnumPatchOptions::default().with_rich_attr("icons"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::NotRichEnum(name) if name == "Season"));
    }

    #[test]
    fn extra_attrs_must_not_shadow_rich_attrs() {
        let season = Enum::builder("Season").member("a", 0).rich().build();
        let err = patch_enum(
            &season,
            EnumPatchOptions::default().with_extra_attr("titles"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::RichAttrCollision(attr) if attr == "titles"));

        let err = patch_enum(
            &season,
            EnumPatchOptions::default()
                .with_rich_attr("icons")
                .with_extra_attr("icons"),
        )
        .unwrap_err();
        assert!(matches!(err, Error::RichAttrCollision(attr) if attr == "icons"));
    }

    #[test]
    fn extra_attrs_copy_and_overwrite() {
        let season = Enum::builder("Season").member("a", 0).attr("note", "old").build();
        let patch = Enum::builder("SeasonPatch").attr("note", "new").build();

        patch_enum(&season, EnumPatchOptions::default().with_extra_attr("note"))
            .unwrap()
            .apply(&patch)
            .unwrap();
        assert_eq!(season.attr("note"), Some(Value::from("new")));

        // Missing on the patch side surfaces as attribute-not-found.
        let empty = Enum::builder("Empty").build();
        let err = patch_enum(&season, EnumPatchOptions::default().with_extra_attr("gone"))
            .unwrap()
            .apply(&empty)
            .unwrap_err();
        assert!(matches!(err, Error::AttributeNotFound { name, .. } if name == "gone"));
    }

    #[test]
    fn requested_rich_attrs_extend_alongside_the_base_set() {
        let season = Enum::builder("Season")
            .member("a", 0)
            .rich_values("titles", vec![Some(Value::from("A"))])
            .rich_values("icons", vec![Some(Value::from("sun"))])
            .build();
        let patch = Enum::builder("SeasonPatch")
            .member("b", 1)
            .rich_values("titles", vec![Some(Value::from("B"))])
            .rich_values("icons", vec![Some(Value::from("moon"))])
            .build();

        patch_enum(
            &season,
            EnumPatchOptions::default().with_rich_attr("icons"),
        )
        .unwrap()
        .apply(&patch)
        .unwrap();

        assert_eq!(
            season.rich_values("icons").unwrap(),
            vec![Some(Value::from("sun")), Some(Value::from("moon"))]
        );
        assert_eq!(season.rich_values("titles").unwrap().len(), 2);
    }

    #[test]
    fn report_serializes_members_in_order() {
        let season = target();
        let json = serde_json::to_value(season.report()).unwrap();
        assert_eq!(json["members"][0]["name"], "a");
        assert_eq!(json["members"][1]["value"], 1);
        assert_eq!(json["rich"], false);
    }
}
