use std::fmt;

/// Keys owned by [`PageQuery`]; extra parameters may not use them.
pub const RESERVED_KEYS: [&str; 5] = ["skip", "limit", "sort_by", "sort_order", "$filter"];

/// Direction sent as `sort_order`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pagination, sorting and filter inputs of a list call.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub skip: Option<u64>,
    pub limit: Option<u64>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
    /// Opaque filter expression sent as `$filter`.
    pub filter: Option<String>,
    /// Additional parameters passed through verbatim.
    pub extra: Vec<(String, String)>,
}

impl PageQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sorts by `sort_by` in the given order.
    pub fn sort(mut self, sort_by: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(sort_by.into());
        self.sort_order = Some(order);
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Adds a pass-through parameter. Reserved keys are ignored on the wire.
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.extra.push((key.into(), value.to_string()));
        self
    }

    /// Query pairs in wire order. Extra pairs using a reserved key are dropped.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(5 + self.extra.len());
        if let Some(skip) = self.skip {
            pairs.push(("skip".to_owned(), skip.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_owned(), limit.to_string()));
        }
        if let Some(sort_by) = &self.sort_by {
            pairs.push(("sort_by".to_owned(), sort_by.clone()));
        }
        if let Some(order) = self.sort_order {
            pairs.push(("sort_order".to_owned(), order.as_str().to_owned()));
        }
        if let Some(filter) = &self.filter {
            pairs.push(("$filter".to_owned(), filter.clone()));
        }
        pairs.extend(
            self.extra
                .iter()
                .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
                .cloned(),
        );
        pairs
    }
}
