use crate::model::plugin::{SortDirection, SortField, SortRule, default_sort};

/// Parse one `field[:asc|:desc]` token
pub fn parse_sort_rule(token: &str) -> Result<SortRule, String> {
    let token = token.trim();
    let (field_str, dir_str) = match token.split_once(':') {
        Some((f, d)) => (f.trim(), Some(d.trim())),
        None => (token, None),
    };

    let field = match field_str.to_lowercase().as_str() {
        "priority" => SortField::Priority,
        "title" => SortField::Title,
        "status" => SortField::Status,
        "updated" | "updated_at" | "updatedat" => SortField::UpdatedAt,
        "created" | "created_at" | "createdat" => SortField::CreatedAt,
        "points" => SortField::Points,
        "" => return Err("empty sort field".to_string()),
        other => return Err(format!("unknown sort field '{}'", other)),
    };

    let direction = match dir_str.map(|d| d.to_lowercase()) {
        None => SortDirection::Asc,
        Some(d) if d == "asc" => SortDirection::Asc,
        Some(d) if d == "desc" => SortDirection::Desc,
        Some(d) => return Err(format!("unknown sort direction '{}'", d)),
    };

    Ok(SortRule { field, direction })
}

/// Parse a list of sort tokens. An empty list yields the default
/// (priority ascending, then title ascending).
pub fn parse_sort(tokens: &[String]) -> Result<Vec<SortRule>, String> {
    let rules = tokens
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| parse_sort_rule(t))
        .collect::<Result<Vec<_>, _>>()?;
    if rules.is_empty() {
        Ok(default_sort())
    } else {
        Ok(rules)
    }
}
