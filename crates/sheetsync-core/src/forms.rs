use crate::edit::NewColumn;
use crate::error::FormError;

/// The "add multiple rows" form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowCountForm {
    pub rows_count: usize,
}

impl RowCountForm {
    /// Validate the rows-count input: required, positive integer
    pub fn parse(input: &str) -> Result<Self, FormError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(FormError::MissingRowCount);
        }
        match trimmed.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Self { rows_count: n }),
            _ => Err(FormError::InvalidRowCount(trimmed.to_string())),
        }
    }
}

/// The "add columns" form: a list of header name / field name pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnForm {
    entries: Vec<NewColumn>,
}

impl ColumnForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, header_name: impl Into<String>, field: impl Into<String>) -> &mut Self {
        self.entries.push(NewColumn::new(header_name, field));
        self
    }

    /// Parse a `HEADER:FIELD` argument
    pub fn add_spec(&mut self, spec: &str) -> Result<&mut Self, FormError> {
        let (header, field) = spec
            .split_once(':')
            .ok_or_else(|| FormError::MalformedColumn(spec.to_string()))?;
        Ok(self.add(header, field))
    }

    pub fn remove(&mut self, index: usize) -> Option<NewColumn> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    pub fn entries(&self) -> &[NewColumn] {
        &self.entries
    }

    /// Check every entry has both names and hand back the columns
    pub fn submit(self) -> Result<Vec<NewColumn>, FormError> {
        if self.entries.is_empty() {
            return Err(FormError::NoColumns);
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if entry.header_name.trim().is_empty() {
                return Err(FormError::MissingHeaderName(i + 1));
            }
            if entry.field.trim().is_empty() {
                return Err(FormError::MissingFieldName(i + 1));
            }
        }
        Ok(self.entries)
    }
}
