//! Type definitions of a low-level SQL string representation.

/// SQL text under construction.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SQL {
    pub sql: String,
}

impl SQL {
    pub fn new() -> SQL {
        SQL { sql: String::new() }
    }

    pub fn append_syntax(&mut self, sql: &str) {
        self.sql.push_str(sql);
    }

    pub fn append_identifier(&mut self, identifier: &str) {
        self.sql.push('[');
        self.sql.push_str(&identifier.replace(']', "]]"));
        self.sql.push(']');
    }

    pub fn append_string_literal(&mut self, literal: &str) {
        self.sql.push_str("N'");
        self.sql.push_str(&literal.replace('\'', "''"));
        self.sql.push('\'');
    }

    /// Append each item, separated by `separator`.
    pub fn append_separated<T>(
        &mut self,
        items: &[T],
        separator: &str,
        mut append: impl FnMut(&T, &mut SQL),
    ) {
        for (index, item) in items.iter().enumerate() {
            if index > 0 {
                self.append_syntax(separator);
            }
            append(item, self);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_and_literals_are_escaped() {
        let mut sql = SQL::new();
        sql.append_identifier("odd]name");
        sql.append_syntax(" = ");
        sql.append_string_literal("it's");
        assert_eq!(sql.sql, "[odd]]name] = N'it''s'");
    }
}
