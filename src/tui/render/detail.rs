use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::model::ticket::Ticket;
use crate::tui::theme::Theme;
use crate::tui::views::DetailView;

use super::helpers::{clamp_scroll, wrap_plain};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Full ticket: fields, description and comments, scrolled as one page
pub fn render_detail(frame: &mut Frame, view: &mut DetailView, theme: &Theme, area: Rect) {
    let bg = theme.background;
    let width = area.width.saturating_sub(2) as usize;
    let height = area.height as usize;

    let lines = match view.ticket() {
        Some(ticket) => detail_lines(ticket, theme, width),
        None => vec![Line::from(Span::styled(
            format!(" {} no longer exists", view.ticket_id()),
            Style::default().fg(theme.red),
        ))],
    };

    view.scroll = clamp_scroll(view.scroll, lines.len(), height);
    let visible: Vec<Line> = lines.into_iter().skip(view.scroll).take(height).collect();
    frame.render_widget(Paragraph::new(visible).style(Style::default().bg(bg)), area);
}

fn field(label: &str, value: String, value_style: Style, theme: &Theme) -> Vec<Span<'static>> {
    vec![
        Span::styled(format!(" {}: ", label), Style::default().fg(theme.dim)),
        Span::styled(value, value_style),
        Span::raw("  "),
    ]
}

fn detail_lines(ticket: &Ticket, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    lines.push(Line::from(vec![
        Span::styled(format!(" {} ", ticket.id), Style::default().fg(theme.dim)),
        Span::styled(
            ticket.title.clone(),
            Style::default()
                .fg(theme.text_bright)
                .add_modifier(Modifier::BOLD),
        ),
    ]));
    lines.push(Line::default());

    let mut row = Vec::new();
    row.extend(field(
        "status",
        ticket.status.label().to_string(),
        Style::default().fg(theme.status_color(ticket.status)),
        theme,
    ));
    row.extend(field(
        "type",
        ticket.ticket_type.as_str().to_string(),
        Style::default().fg(theme.type_color(ticket.ticket_type)),
        theme,
    ));
    row.extend(field(
        "priority",
        ticket.priority.to_string(),
        Style::default().fg(theme.priority_color(ticket.priority)),
        theme,
    ));
    row.extend(field(
        "points",
        ticket.points.to_string(),
        Style::default().fg(theme.points_color(ticket.points)),
        theme,
    ));
    lines.push(Line::from(row));

    let assignee = if ticket.assignee.is_empty() {
        "Unassigned".to_string()
    } else {
        ticket.assignee.clone()
    };
    let mut row = field("assignee", assignee, Style::default().fg(theme.cyan), theme);
    if !ticket.tags.is_empty() {
        let tags: Vec<String> = ticket.tags.iter().map(|t| format!("#{}", t)).collect();
        row.extend(field("tags", tags.join(" "), Style::default().fg(theme.purple), theme));
    }
    lines.push(Line::from(row));

    let mut row = field(
        "created",
        ticket.created_at.format(DATE_FORMAT).to_string(),
        Style::default().fg(theme.text),
        theme,
    );
    if !ticket.created_by.is_empty() {
        row.extend(field("by", ticket.created_by.clone(), Style::default().fg(theme.text), theme));
    }
    row.extend(field(
        "updated",
        ticket.updated_at.format(DATE_FORMAT).to_string(),
        Style::default().fg(theme.text),
        theme,
    ));
    lines.push(Line::from(row));
    lines.push(Line::default());

    let text_style = Style::default().fg(theme.text);
    for l in wrap_plain(&ticket.body, width) {
        lines.push(Line::from(Span::styled(format!(" {}", l), text_style)));
    }

    if !ticket.comments.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            format!(" Comments ({})", ticket.comments.len()),
            Style::default().fg(theme.purple).add_modifier(Modifier::BOLD),
        )));
        for comment in &ticket.comments {
            lines.push(Line::from(vec![
                Span::styled(format!("  {}", comment.author), Style::default().fg(theme.cyan)),
                Span::styled(
                    format!("  {}", comment.created_at.format(DATE_FORMAT)),
                    Style::default().fg(theme.dim),
                ),
            ]));
            for l in wrap_plain(&comment.body, width.saturating_sub(4)) {
                lines.push(Line::from(Span::styled(format!("    {}", l), text_style)));
            }
        }
    }
    lines
}
