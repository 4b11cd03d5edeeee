use chrono::{DateTime, Utc};
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Paragraph};

use crate::model::plugin::ViewMode;
use crate::model::ticket::Ticket;
use crate::tui::theme::Theme;
use crate::tui::views::BoardView;
use crate::util::unicode::{truncate_to_width, wrap_to_width};

/// Card height in rows, borders included
fn card_height(mode: ViewMode) -> u16 {
    match mode {
        ViewMode::Compact => 3,
        ViewMode::Expanded => 6,
    }
}

/// Keep `row` inside the visible window of `visible` rows out of `total`
pub(super) fn adjust_scroll(scroll: usize, row: usize, visible: usize, total: usize) -> usize {
    let visible = visible.max(1);
    let mut scroll = scroll;
    if row < scroll {
        scroll = row;
    } else if row >= scroll + visible {
        scroll = row + 1 - visible;
    }
    scroll.min(total.saturating_sub(visible))
}

/// Render every lane side by side
pub fn render_board(frame: &mut Frame, view: &BoardView, theme: &Theme, now: DateTime<Utc>, area: Rect) {
    let lane_count = view.lanes().len();
    if lane_count == 0 {
        let msg = Paragraph::new(format!(" {} has no lanes", view.plugin().name))
            .style(Style::default().fg(theme.dim).bg(theme.background));
        frame.render_widget(msg, area);
        return;
    }
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(vec![Constraint::Ratio(1, lane_count as u32); lane_count])
        .split(area);
    for (i, chunk) in chunks.iter().enumerate() {
        render_lane(frame, view, i, theme, now, *chunk);
    }
}

fn render_lane(
    frame: &mut Frame,
    view: &BoardView,
    lane_idx: usize,
    theme: &Theme,
    now: DateTime<Utc>,
    area: Rect,
) {
    let (Some(lane), Some(tickets)) = (view.plugin().lane(lane_idx), view.lanes().get(lane_idx)) else {
        return;
    };
    let config = view.config();
    let is_current_lane = config.selected_lane() == lane_idx;
    let bg = theme.background;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);

    let title_style = if is_current_lane {
        Style::default()
            .fg(theme.text_bright)
            .bg(theme.selection_bg)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text).bg(bg)
    };
    let title = format!(" {} ({}) ", lane.name, tickets.len());
    frame.render_widget(
        Paragraph::new(Line::from(Span::styled(
            truncate_to_width(&title, area.width as usize),
            title_style,
        )))
        .style(Style::default().bg(bg)),
        chunks[0],
    );

    let body = chunks[1];
    if tickets.is_empty() {
        frame.render_widget(
            Paragraph::new(" (empty)").style(Style::default().fg(theme.dim).bg(bg)),
            body,
        );
        return;
    }

    let mode = config.view_mode();
    let height = card_height(mode);
    let columns = lane.columns.max(1);
    let total_rows = tickets.len().div_ceil(columns);
    let visible_rows = ((body.height / height) as usize).max(1);
    let cursor = config.lane_cursor(lane_idx);
    let scroll = adjust_scroll(cursor.scroll, cursor.index / columns, visible_rows, total_rows);
    config.set_lane_scroll(lane_idx, scroll);

    let row_areas = Layout::default()
        .direction(Direction::Vertical)
        .constraints(vec![Constraint::Length(height); visible_rows])
        .split(body);
    for (visible_row, row_area) in row_areas.iter().enumerate() {
        let row = scroll + visible_row;
        if row >= total_rows {
            break;
        }
        let cells = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(vec![Constraint::Ratio(1, columns as u32); columns])
            .split(*row_area);
        for (col, cell) in cells.iter().enumerate() {
            let index = row * columns + col;
            let Some(ticket) = tickets.get(index) else {
                break;
            };
            let selected = is_current_lane && index == cursor.index;
            render_card(frame, ticket, mode, selected, theme, now, *cell);
        }
    }
}

fn render_card(
    frame: &mut Frame,
    ticket: &Ticket,
    mode: ViewMode,
    selected: bool,
    theme: &Theme,
    now: DateTime<Utc>,
    area: Rect,
) {
    let border = if selected {
        theme.selection_border
    } else {
        theme.card_border
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border).bg(theme.background));
    let inner_width = area.width.saturating_sub(2) as usize;
    let lines = card_lines(ticket, mode, theme, now, inner_width);
    let paragraph = Paragraph::new(lines)
        .block(block)
        .style(Style::default().bg(if selected {
            theme.selection_bg
        } else {
            theme.background
        }));
    frame.render_widget(paragraph, area);
}

/// Text inside a card
pub(super) fn card_lines(
    ticket: &Ticket,
    mode: ViewMode,
    theme: &Theme,
    now: DateTime<Utc>,
    width: usize,
) -> Vec<Line<'static>> {
    let title_style = Style::default().fg(theme.title_color(ticket, now));
    match mode {
        ViewMode::Compact => {
            let id = format!("{} ", ticket.id);
            let id_width = id.len().min(width);
            vec![Line::from(vec![
                Span::styled(truncate_to_width(&id, width), Style::default().fg(theme.dim)),
                Span::styled(
                    truncate_to_width(&ticket.title, width.saturating_sub(id_width)),
                    title_style,
                ),
            ])]
        }
        ViewMode::Expanded => {
            let mut lines: Vec<Line<'static>> = wrap_to_width(&ticket.title, width, 2)
                .into_iter()
                .map(|l| Line::from(Span::styled(l, title_style)))
                .collect();
            while lines.len() < 2 {
                lines.push(Line::default());
            }

            let mut meta = vec![
                Span::styled(
                    ticket.ticket_type.as_str().to_string(),
                    Style::default().fg(theme.type_color(ticket.ticket_type)),
                ),
                Span::raw(" "),
                Span::styled(
                    format!("P{}", ticket.priority),
                    Style::default().fg(theme.priority_color(ticket.priority)),
                ),
                Span::raw(" "),
                Span::styled(
                    format!("{}pt", ticket.points),
                    Style::default().fg(theme.points_color(ticket.points)),
                ),
            ];
            if !ticket.assignee.is_empty() {
                meta.push(Span::styled(
                    format!(" @{}", ticket.assignee),
                    Style::default().fg(theme.cyan),
                ));
            }
            lines.push(Line::from(meta));

            let tags: Vec<String> = ticket.tags.iter().map(|t| format!("#{}", t)).collect();
            lines.push(Line::from(Span::styled(
                truncate_to_width(&format!("{} {}", ticket.id, tags.join(" ")), width),
                Style::default().fg(theme.dim),
            )));
            lines
        }
    }
}
