use crate::model::plugin::TicketAction;
use crate::model::ticket::{MAX_PRIORITY, MIN_PRIORITY, Status, TicketType};

/// Parse an action keyword from a workflow file.
///
/// Accepted forms: `status=<s>`, `type=<t>`, `tags+=<t>`, `tags-=<t>`,
/// `priority=<n>`, `points=<n>`, `delete`, `open`, `edit`, `new`.
pub fn parse_action(src: &str) -> Result<TicketAction, String> {
    let src = src.trim();
    match src.to_lowercase().as_str() {
        "delete" => return Ok(TicketAction::Delete),
        "open" | "view" | "detail" => return Ok(TicketAction::OpenDetail),
        "edit" => return Ok(TicketAction::OpenEdit),
        "new" | "create" => return Ok(TicketAction::NewTicket),
        _ => {}
    }

    if let Some((key, value)) = src.split_once("+=") {
        return match key.trim().to_lowercase().as_str() {
            "tags" | "tag" => non_empty(value).map(TicketAction::AddTag),
            other => Err(format!("'+=' not supported for '{}'", other)),
        };
    }
    if let Some((key, value)) = src.split_once("-=") {
        return match key.trim().to_lowercase().as_str() {
            "tags" | "tag" => non_empty(value).map(TicketAction::RemoveTag),
            other => Err(format!("'-=' not supported for '{}'", other)),
        };
    }

    let Some((key, value)) = src.split_once('=') else {
        return Err(format!("unknown action '{}'", src));
    };
    let value = value.trim();
    match key.trim().to_lowercase().as_str() {
        "status" => Status::from_alias(value)
            .map(TicketAction::SetStatus)
            .ok_or_else(|| format!("unknown status '{}'", value)),
        "type" => TicketType::parse(value)
            .map(TicketAction::SetType)
            .ok_or_else(|| format!("unknown type '{}'", value)),
        "priority" => match value.parse::<u8>() {
            Ok(n) if (MIN_PRIORITY..=MAX_PRIORITY).contains(&n) => {
                Ok(TicketAction::SetPriority(n))
            }
            _ => Err(format!("priority must be 1..5, got '{}'", value)),
        },
        "points" => value
            .parse::<u32>()
            .map(TicketAction::SetPoints)
            .map_err(|_| format!("invalid points '{}'", value)),
        other => Err(format!("unknown action field '{}'", other)),
    }
}

fn non_empty(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() {
        Err("missing tag name".to_string())
    } else {
        Ok(value.to_string())
    }
}
