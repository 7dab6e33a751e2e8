use std::fmt;

use crate::{
    buffer::BufferPool,
    encode::render_fields,
    error::LogResult,
    field::Field,
    option::{Encoding, Format},
};

/// Fields attached to a logger, with both prefix renderings cached.
///
/// Built once per [`Logger::bind`](crate::Logger::bind) and then only read,
/// so every record from that logger copies the prefix bytes verbatim instead
/// of re-encoding the bound fields.
pub struct BoundFields {
    fields: Vec<Field<'static>>,
    text: Box<[u8]>,
    json: Box<[u8]>,
}

impl BoundFields {
    /// No bound fields; both prefixes are empty.
    pub fn empty() -> Self {
        BoundFields {
            fields: Vec::new(),
            text: Box::default(),
            json: Box::default(),
        }
    }

    /// Inherited fields followed by `new`, in order and without
    /// de-duplication, with both prefixes rendered once.
    pub fn bind(
        &self,
        new: &[Field<'_>],
        encoding: &Encoding,
        buffers: &BufferPool,
    ) -> LogResult<BoundFields> {
        let mut fields = Vec::with_capacity(self.fields.len() + new.len());
        fields.extend(self.fields.iter().cloned());
        fields.extend(new.iter().map(Field::to_static));

        let mut buf = buffers.acquire(0);
        render_fields(&mut buf, Format::Text, &fields, encoding)?;
        let text = buf.to_boxed_slice();
        buf.clear();
        render_fields(&mut buf, Format::Json, &fields, encoding)?;
        let json = buf.to_boxed_slice();

        Ok(BoundFields { fields, text, json })
    }

    /// Pre-rendered fragment for `format`: ` k=v...` for text,
    /// `,"k":v...` for JSON.
    pub fn prefix(&self, format: Format) -> &[u8] {
        match format {
            Format::Text => &self.text,
            Format::Json => &self.json,
        }
    }

    /// Bound fields in bind order.
    pub fn fields(&self) -> &[Field<'static>] {
        &self.fields
    }

    /// Whether nothing is bound.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl Default for BoundFields {
    fn default() -> Self {
        BoundFields::empty()
    }
}

impl fmt::Debug for BoundFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundFields")
            .field("fields", &self.fields)
            .field("text", &String::from_utf8_lossy(&self.text))
            .field("json", &String::from_utf8_lossy(&self.json))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn bind(parent: &BoundFields, fields: &[Field<'_>]) -> BoundFields {
        parent
            .bind(fields, &Encoding::default(), &BufferPool::default())
            .expect("bind")
    }

    #[test]
    fn empty_has_no_prefix() {
        let bound = BoundFields::empty();
        assert!(bound.is_empty());
        assert!(bound.prefix(Format::Text).is_empty());
        assert!(bound.prefix(Format::Json).is_empty());
    }

    #[test]
    fn renders_both_formats() {
        let bound = bind(&BoundFields::empty(), &[
            Field::str("svc", "api"),
            Field::duration("budget", Duration::from_millis(250)),
        ]);
        assert_eq!(bound.prefix(Format::Text), b" svc=api budget=250ms");
        assert_eq!(
            bound.prefix(Format::Json),
            br#","svc":"api","budget":"250ms""#
        );
    }

    #[test]
    fn nested_binds_match_a_single_bind() {
        let a = [Field::str("svc", "api"), Field::int64("shard", 3)];
        let b = [Field::str("svc", "override"), Field::bool("canary", true)];

        let nested = bind(&bind(&BoundFields::empty(), &a), &b);
        let all: Vec<_> = a.iter().chain(b.iter()).cloned().collect();
        let flat = bind(&BoundFields::empty(), &all);

        for format in [Format::Text, Format::Json] {
            assert_eq!(nested.prefix(format), flat.prefix(format));
        }
        let keys: Vec<_> = nested.fields().iter().map(Field::key).collect();
        assert_eq!(keys, ["svc", "shard", "svc", "canary"]);
    }

    #[test]
    fn parent_is_untouched() {
        let parent = bind(&BoundFields::empty(), &[Field::str("svc", "api")]);
        let _child = bind(&parent, &[Field::int64("req", 1)]);
        assert_eq!(parent.prefix(Format::Text), b" svc=api");
        assert_eq!(parent.fields().len(), 1);
    }

    #[test]
    fn borrowed_inputs_are_copied() {
        let bound = {
            let value = String::from("temporary");
            bind(&BoundFields::empty(), &[Field::str("k", value.as_str())])
        };
        assert_eq!(bound.prefix(Format::Text), b" k=temporary");
    }
}
