// Copyright 2016 the fix44 project developers. See the COPYRIGHT file
// at the top-level directory of this distribution.
//
// Licensed under:
//   the MIT license
//     <LICENSE-MIT or https://opensource.org/licenses/MIT>
//   or the Apache License, Version 2.0
//     <LICENSE-APACHE or https://www.apache.org/licenses/LICENSE-2.0>,
// at your option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Protocol schema loaded from a QuickFIX-dialect XML document.
//!
//! The XML file itself is read by whatever parser the caller prefers; this
//! module consumes the resulting element tree as an [`XmlElem`]. Build order
//! matters: fields first, then the header, then components (components may
//! reference components that appear later in the document, resolved through
//! a pending queue), then messages.

use std::collections::{HashMap, VecDeque};

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::constant::{SENDING_TIME_FORMAT, SENDING_TIME_FORMAT_NO_MILLIS};
use crate::dictionary::fields;
use crate::error::FixError;
use crate::field_tag::FieldTag;
use crate::message::{FieldMap, FixMessage};

/// One element of the schema document: name, attributes, children. Text
/// content is never meaningful in the QuickFIX dialect so it is not kept.
#[derive(Clone, Debug, Default)]
pub struct XmlElem {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlElem>,
}

impl XmlElem {
    pub fn new(name: impl Into<String>) -> Self {
        XmlElem {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    pub fn with_child(mut self, child: XmlElem) -> Self {
        self.children.push(child);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(attr, _)| attr == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn child(&self, name: &str) -> Option<&XmlElem> {
        self.children.iter().find(|child| child.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElem> {
        self.children.iter().filter(move |child| child.name == name)
    }
}

/// FIX wire types as the QuickFIX dialect spells them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FixType {
    Int,
    Length,
    NumInGroup,
    SeqNum,
    Float,
    Qty,
    Price,
    PriceOffset,
    Amt,
    Percentage,
    Char,
    Boolean,
    Str,
    MultipleValueString,
    Currency,
    Exchange,
    Country,
    LocalMktDate,
    MonthYear,
    UtcTimestamp,
    UtcDateOnly,
    UtcTimeOnly,
    Data,
}

impl FixType {
    pub fn parse(name: &str) -> Result<Self, FixError> {
        Ok(match name {
            "INT" => FixType::Int,
            "LENGTH" => FixType::Length,
            "NUMINGROUP" => FixType::NumInGroup,
            "SEQNUM" => FixType::SeqNum,
            "FLOAT" => FixType::Float,
            "QTY" => FixType::Qty,
            "PRICE" => FixType::Price,
            "PRICEOFFSET" => FixType::PriceOffset,
            "AMT" => FixType::Amt,
            "PERCENTAGE" => FixType::Percentage,
            "CHAR" => FixType::Char,
            "BOOLEAN" => FixType::Boolean,
            "STRING" => FixType::Str,
            "MULTIPLEVALUESTRING" => FixType::MultipleValueString,
            "CURRENCY" => FixType::Currency,
            "EXCHANGE" => FixType::Exchange,
            "COUNTRY" => FixType::Country,
            "LOCALMKTDATE" => FixType::LocalMktDate,
            "MONTHYEAR" => FixType::MonthYear,
            "UTCTIMESTAMP" => FixType::UtcTimestamp,
            "UTCDATEONLY" => FixType::UtcDateOnly,
            "UTCTIMEONLY" => FixType::UtcTimeOnly,
            "DATA" => FixType::Data,
            other => {
                return Err(FixError::Validation(format!(
                    "unknown FIX type {:?}",
                    other
                )))
            }
        })
    }
}

/// One field definition: tag, canonical name, wire type, and the enumerated
/// value map when the field is restricted to a value list.
#[derive(Clone, Debug)]
pub struct SchemaField {
    pub tag: FieldTag,
    pub name: String,
    pub fix_type: FixType,
    pub values: Option<HashMap<String, String>>,
}

impl SchemaField {
    /// Checks a raw wire string against the field's type and value list.
    pub fn validate_value(&self, raw: &str) -> Result<(), FixError> {
        self.validate_type(raw)?;

        if let Some(values) = &self.values {
            let tokens: Box<dyn Iterator<Item = &str>> =
                if self.fix_type == FixType::MultipleValueString {
                    Box::new(raw.split(' '))
                } else {
                    Box::new(std::iter::once(raw))
                };
            for token in tokens {
                if !values.contains_key(token) {
                    return Err(FixError::Validation(format!(
                        "{} ({}) does not allow value {:?}",
                        self.name, self.tag, token
                    )));
                }
            }
        }

        Ok(())
    }

    fn validate_type(&self, raw: &str) -> Result<(), FixError> {
        let ok = match self.fix_type {
            FixType::Int => raw.parse::<i64>().is_ok(),
            FixType::Length | FixType::NumInGroup | FixType::SeqNum => raw.parse::<u64>().is_ok(),
            FixType::Float
            | FixType::Qty
            | FixType::Price
            | FixType::PriceOffset
            | FixType::Amt
            | FixType::Percentage => raw.parse::<f64>().is_ok(),
            FixType::Char => raw.chars().count() == 1,
            FixType::Boolean => raw == "Y" || raw == "N",
            FixType::UtcTimestamp => parse_utc_timestamp(raw),
            FixType::UtcDateOnly | FixType::LocalMktDate => {
                NaiveDate::parse_from_str(raw, "%Y%m%d").is_ok()
            }
            FixType::UtcTimeOnly => {
                NaiveTime::parse_from_str(raw, "%H:%M:%S%.3f").is_ok()
                    || NaiveTime::parse_from_str(raw, "%H:%M:%S").is_ok()
            }
            FixType::MonthYear => parse_month_year(raw),
            FixType::Str
            | FixType::MultipleValueString
            | FixType::Currency
            | FixType::Exchange
            | FixType::Country
            | FixType::Data => true,
        };

        if ok {
            Ok(())
        } else {
            Err(FixError::Validation(format!(
                "{} ({}) value {:?} is not a valid {:?}",
                self.name, self.tag, raw, self.fix_type
            )))
        }
    }
}

fn parse_utc_timestamp(raw: &str) -> bool {
    NaiveDateTime::parse_from_str(raw, SENDING_TIME_FORMAT).is_ok()
        || NaiveDateTime::parse_from_str(raw, SENDING_TIME_FORMAT_NO_MILLIS).is_ok()
}

//YYYYMM with an optional day or week suffix (YYYYMMDD or YYYYMMwW).
fn parse_month_year(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    if bytes.len() != 6 && bytes.len() != 8 {
        return false;
    }
    if !bytes[..6].iter().all(u8::is_ascii_digit) {
        return false;
    }
    let month: u32 = raw[4..6].parse().unwrap_or(0);
    if !(1..=12).contains(&month) {
        return false;
    }
    match bytes.len() {
        6 => true,
        8 if bytes[6] == b'w' => (b'1'..=b'5').contains(&bytes[7]),
        8 => bytes[6..].iter().all(u8::is_ascii_digit),
        _ => false,
    }
}

/// A member of a schema set: a plain field or a nested repeating group.
#[derive(Clone, Debug)]
pub enum Member {
    Field(FieldTag),
    Group(GroupDefn),
}

#[derive(Clone, Debug)]
pub struct GroupDefn {
    pub count_tag: FieldTag,
    pub set: SchemaSet,
}

/// Ordered name -> (member, required) map shared by groups, components,
/// messages, and the header.
#[derive(Clone, Debug, Default)]
pub struct SchemaSet {
    pub name: String,
    members: Vec<(String, Member, bool)>,
}

impl SchemaSet {
    fn new(name: impl Into<String>) -> Self {
        SchemaSet {
            name: name.into(),
            members: Vec::new(),
        }
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Member, bool)> {
        self.members
            .iter()
            .map(|(name, member, required)| (name.as_str(), member, *required))
    }

    /// True when the tag is a direct member, either as a field or as the
    /// count tag of a nested group.
    pub fn contains_tag(&self, tag: FieldTag) -> bool {
        self.members.iter().any(|(_, member, _)| match member {
            Member::Field(member_tag) => *member_tag == tag,
            Member::Group(defn) => defn.count_tag == tag,
        })
    }

    fn push(&mut self, name: String, member: Member, required: bool) {
        self.members.push((name, member, required));
    }

    //Component flattening: members are copied in order, and a member is only
    //required when both it and the component carrying it are required.
    fn merge_component(&mut self, component: &SchemaSet, required: bool) {
        for (name, member, member_required) in &component.members {
            self.members
                .push((name.clone(), member.clone(), *member_required && required));
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MsgCat {
    Admin,
    App,
}

#[derive(Clone, Debug)]
pub struct SchemaMessage {
    pub name: String,
    pub msg_type: String,
    pub msg_cat: MsgCat,
    pub set: SchemaSet,
}

/// The whole schema, keyed by tag number and by message type.
#[derive(Clone, Debug)]
pub struct FixSchema {
    fields_by_tag: HashMap<u32, SchemaField>,
    fields_by_name: HashMap<String, FieldTag>,
    header: SchemaSet,
    components: HashMap<String, SchemaSet>,
    messages: HashMap<String, SchemaMessage>,
}

//Component resolution can fail because the referenced component simply has
//not been built yet. That case goes back on the pending queue; everything
//else is fatal.
enum BuildError {
    Unresolved(String),
    Fatal(FixError),
}

impl From<FixError> for BuildError {
    fn from(err: FixError) -> Self {
        BuildError::Fatal(err)
    }
}

impl FixSchema {
    pub fn from_xml(root: &XmlElem) -> Result<Self, FixError> {
        if root.name != "fix" || root.attr("major") != Some("4") || root.attr("minor") != Some("4")
        {
            return Err(FixError::Validation(
                "schema document is not FIX 4.4".to_string(),
            ));
        }

        let mut schema = FixSchema {
            fields_by_tag: HashMap::new(),
            fields_by_name: HashMap::new(),
            header: SchemaSet::new("Header"),
            components: HashMap::new(),
            messages: HashMap::new(),
        };

        let fields_elem = root
            .child("fields")
            .ok_or_else(|| FixError::Validation("schema has no <fields> section".to_string()))?;
        for field_elem in fields_elem.children_named("field") {
            schema.add_field(field_elem)?;
        }

        //Header before components: component members may be validated against
        //header fields, never the other way around.
        if let Some(header_elem) = root.child("header") {
            schema.header = match schema.build_set("Header", header_elem) {
                Ok(set) => set,
                Err(BuildError::Unresolved(name)) => {
                    return Err(FixError::Validation(format!(
                        "header references unknown component {:?}",
                        name
                    )))
                }
                Err(BuildError::Fatal(err)) => return Err(err),
            };
        }

        if let Some(components_elem) = root.child("components") {
            schema.build_components(components_elem)?;
        }

        let messages_elem = root
            .child("messages")
            .ok_or_else(|| FixError::Validation("schema has no <messages> section".to_string()))?;
        for message_elem in messages_elem.children_named("message") {
            schema.add_message(message_elem)?;
        }

        Ok(schema)
    }

    pub fn field(&self, tag: FieldTag) -> Option<&SchemaField> {
        self.fields_by_tag.get(&tag.0)
    }

    pub fn field_by_name(&self, name: &str) -> Option<&SchemaField> {
        self.fields_by_name
            .get(name)
            .and_then(|tag| self.field(*tag))
    }

    pub fn message(&self, msg_type: &str) -> Option<&SchemaMessage> {
        self.messages.get(msg_type)
    }

    pub fn header(&self) -> &SchemaSet {
        &self.header
    }

    fn add_field(&mut self, elem: &XmlElem) -> Result<(), FixError> {
        let number = elem
            .attr("number")
            .and_then(|number| number.parse::<u32>().ok())
            .ok_or_else(|| {
                FixError::Validation(format!("field {:?} has no usable number", elem.attr("name")))
            })?;
        let name = elem
            .attr("name")
            .ok_or_else(|| FixError::Validation(format!("field {} has no name", number)))?
            .to_string();
        let fix_type = FixType::parse(elem.attr("type").unwrap_or_default())?;

        let mut values = None;
        for value_elem in elem.children_named("value") {
            let key = value_elem
                .attr("enum")
                .ok_or_else(|| {
                    FixError::Validation(format!("value of field {} has no enum", name))
                })?
                .to_string();
            let description = value_elem.attr("description").unwrap_or_default().to_string();
            values
                .get_or_insert_with(HashMap::new)
                .insert(key, description);
        }

        let tag = FieldTag(number);
        self.fields_by_name.insert(name.clone(), tag);
        self.fields_by_tag.insert(
            number,
            SchemaField {
                tag,
                name,
                fix_type,
                values,
            },
        );
        Ok(())
    }

    fn build_components(&mut self, components_elem: &XmlElem) -> Result<(), FixError> {
        let mut pending: VecDeque<&XmlElem> =
            components_elem.children_named("component").collect();

        //Two passes worth of patience per element: a component that still
        //fails once everything resolvable has resolved is part of a cycle.
        let mut stalled = 0;
        while let Some(elem) = pending.pop_front() {
            let name = elem
                .attr("name")
                .ok_or_else(|| FixError::Validation("component has no name".to_string()))?;
            match self.build_set(name, elem) {
                Ok(set) => {
                    self.components.insert(name.to_string(), set);
                    stalled = 0;
                }
                Err(BuildError::Unresolved(_)) => {
                    stalled += 1;
                    if stalled > pending.len() {
                        return Err(FixError::Validation(format!(
                            "component {:?} is part of an unresolvable reference cycle",
                            name
                        )));
                    }
                    pending.push_back(elem);
                }
                Err(BuildError::Fatal(err)) => return Err(err),
            }
        }
        Ok(())
    }

    fn add_message(&mut self, elem: &XmlElem) -> Result<(), FixError> {
        let name = elem
            .attr("name")
            .ok_or_else(|| FixError::Validation("message has no name".to_string()))?
            .to_string();
        let msg_type = elem
            .attr("msgtype")
            .ok_or_else(|| FixError::Validation(format!("message {} has no msgtype", name)))?
            .to_string();
        let msg_cat = match elem.attr("msgcat") {
            Some("admin") => MsgCat::Admin,
            Some("app") => MsgCat::App,
            other => {
                return Err(FixError::Validation(format!(
                    "message {} has bad msgcat {:?}",
                    name, other
                )))
            }
        };

        let set = match self.build_set(&name, elem) {
            Ok(set) => set,
            Err(BuildError::Unresolved(component)) => {
                return Err(FixError::Validation(format!(
                    "message {} references unknown component {:?}",
                    name, component
                )))
            }
            Err(BuildError::Fatal(err)) => return Err(err),
        };

        self.messages.insert(
            msg_type.clone(),
            SchemaMessage {
                name,
                msg_type,
                msg_cat,
                set,
            },
        );
        Ok(())
    }

    fn build_set(&self, name: &str, elem: &XmlElem) -> Result<SchemaSet, BuildError> {
        let mut set = SchemaSet::new(name);
        for child in &elem.children {
            let required = child.attr("required") == Some("Y");
            match child.name.as_str() {
                "field" => {
                    let field_name = child.attr("name").ok_or_else(|| {
                        FixError::Validation(format!("{}: field member has no name", name))
                    })?;
                    let tag = *self.fields_by_name.get(field_name).ok_or_else(|| {
                        FixError::Validation(format!(
                            "{}: field {:?} is not defined",
                            name, field_name
                        ))
                    })?;
                    set.push(field_name.to_string(), Member::Field(tag), required);
                }
                "component" => {
                    let component_name = child.attr("name").ok_or_else(|| {
                        FixError::Validation(format!("{}: component member has no name", name))
                    })?;
                    match self.components.get(component_name) {
                        Some(component) => set.merge_component(component, required),
                        None => {
                            return Err(BuildError::Unresolved(component_name.to_string()));
                        }
                    }
                }
                "group" => {
                    let group_name = child.attr("name").ok_or_else(|| {
                        FixError::Validation(format!("{}: group member has no name", name))
                    })?;
                    let count_field = self
                        .fields_by_name
                        .get(group_name)
                        .and_then(|tag| self.field(*tag))
                        .ok_or_else(|| {
                            FixError::Validation(format!(
                                "{}: group count field {:?} is not defined",
                                name, group_name
                            ))
                        })?;
                    //Group count fields are NUMINGROUP and named "No..." by
                    //convention; anything else is a malformed dictionary.
                    if count_field.fix_type != FixType::NumInGroup
                        || !group_name.starts_with("No")
                    {
                        return Err(BuildError::Fatal(FixError::Validation(format!(
                            "{}: {:?} cannot head a repeating group",
                            name, group_name
                        ))));
                    }

                    let group_set = self.build_set(group_name, child)?;
                    set.push(
                        group_name.to_string(),
                        Member::Group(GroupDefn {
                            count_tag: count_field.tag,
                            set: group_set,
                        }),
                        required,
                    );
                }
                _ => {}
            }
        }
        Ok(set)
    }

    /// Validates a message against the schema: required membership, value
    /// types, enumerated values, and group structure. Any tag that is not
    /// part of the message's composition is rejected.
    pub fn validate(&self, msg: &FixMessage) -> Result<(), FixError> {
        let schema_msg = self.message(msg.msg_type()).ok_or_else(|| {
            FixError::Validation(format!("unknown message type {:?}", msg.msg_type()))
        })?;

        //A message that has not been framed yet carries no standard header;
        //required header fields are only enforced once BeginString is there.
        let framed = msg.contains(fields::BEGIN_STRING);
        self.validate_set(msg.field_map(), &self.header, !framed)?;
        self.validate_set(msg.field_map(), &schema_msg.set, false)?;

        //Reject anything the composition does not name. The framing tags are
        //owned by the codec and always admissible.
        for (tag, _) in msg.field_map().iter() {
            if tag == fields::BEGIN_STRING
                || tag == fields::BODY_LENGTH
                || tag == fields::CHECK_SUM
                || tag == fields::MSG_TYPE
            {
                continue;
            }
            if !self.header.contains_tag(tag) && !schema_msg.set.contains_tag(tag) {
                return Err(FixError::Validation(format!(
                    "tag {} is not part of {}",
                    tag, schema_msg.name
                )));
            }
        }

        Ok(())
    }

    //With `lenient` set, missing required members pass; values of present
    //members are still checked.
    fn validate_set(
        &self,
        container: &FieldMap,
        set: &SchemaSet,
        lenient: bool,
    ) -> Result<(), FixError> {
        for (name, member, required) in set.members() {
            match member {
                Member::Field(tag) => {
                    if container.is_group(*tag) {
                        return Err(FixError::Validation(format!(
                            "{} ({}) must be a plain field, not a group",
                            name, tag
                        )));
                    }
                    match container.get_opt(*tag) {
                        Ok(Some(value)) => {
                            let field = self.field(*tag).ok_or_else(|| {
                                FixError::Validation(format!("tag {} has no definition", tag))
                            })?;
                            field.validate_value(value)?;
                        }
                        Ok(None) => {
                            if required && !lenient {
                                return Err(FixError::Validation(format!(
                                    "required field {} ({}) is missing in {}",
                                    name, tag, set.name
                                )));
                            }
                        }
                        Err(err) => return Err(err),
                    }
                }
                Member::Group(defn) => {
                    if container.contains(defn.count_tag) && !container.is_group(defn.count_tag) {
                        return Err(FixError::Validation(format!(
                            "{} ({}) declares a group but holds a scalar",
                            name, defn.count_tag
                        )));
                    }
                    if !container.contains(defn.count_tag) {
                        if required && !lenient {
                            return Err(FixError::Validation(format!(
                                "required group {} ({}) is missing",
                                name, defn.count_tag
                            )));
                        }
                        continue;
                    }
                    for entry in container.get_group_list(defn.count_tag)? {
                        self.validate_set(entry, &defn.set, false)?;
                        for (tag, _) in entry.iter() {
                            if !defn.set.contains_tag(tag) {
                                return Err(FixError::Validation(format!(
                                    "tag {} is not part of group {}",
                                    tag, name
                                )));
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
