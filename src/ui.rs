//! TUI rendering for the location front-end.
//!
//! One screen: a location header, the resolved address next to a small map,
//! and a key hint bar. The picker is drawn as an overlay when it is open.

use crate::app::App;
use crate::models::LocationStatus;
use ratatui::{
    prelude::*,
    widgets::{canvas::*, *},
};

use ratatui::text::Line;

const SPINNER: [&str; 4] = ["◐", "◓", "◑", "◒"];

/// Renders one frame based on current application state.
///
/// # Arguments
///
/// * `f` - The ratatui frame to draw into (from `terminal.draw()`).
/// * `app` - Current application state (location snapshot, picker, cursor).
pub fn render(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(f.size());

    render_header(f, app, chunks[0]);
    render_body(f, app, chunks[1]);

    let help = if app.picker.visible {
        " type to search   ↑/↓ move   Enter select   Esc close"
    } else {
        " r refresh   c clear   l change location   q quit"
    };
    f.render_widget(
        Paragraph::new(help).style(Style::default().fg(Color::DarkGray)),
        chunks[2],
    );

    if app.picker.visible {
        render_picker(f, app);
    }
}

/// Status line for the in-progress states.
fn progress_text(status: LocationStatus) -> &'static str {
    match status {
        LocationStatus::RequestingPermission => "Requesting permission...",
        LocationStatus::FetchingLocation => "Getting your location...",
        LocationStatus::FetchingAddress => "Fetching address...",
        _ => "",
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let state = &app.location;
    let muted = Style::default().fg(Color::DarkGray);

    let lines = if state.status.is_loading() {
        let spinner = SPINNER[app.tick_count % SPINNER.len()];
        vec![
            Line::from(vec![
                Span::styled(format!(" {} ", spinner), Style::default().fg(Color::Green)),
                Span::raw("Detecting location"),
            ]),
            Line::from(Span::styled(format!("   {}", progress_text(state.status)), muted)),
        ]
    } else if state.status.is_error() {
        vec![
            Line::from(Span::styled(
                " ⌖ Location unavailable",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                format!(
                    "   {}  (r to retry)",
                    state.error.as_deref().unwrap_or("Press l to set a location")
                ),
                muted,
            )),
        ]
    } else if let Some(data) = &state.data {
        let primary = if data.address.primary_text.is_empty() {
            "Current Location"
        } else {
            data.address.primary_text.as_str()
        };
        let secondary = if data.address.secondary_text.is_empty() {
            &data.address.formatted_address
        } else {
            &data.address.secondary_text
        };
        vec![
            Line::from(vec![
                Span::styled(" ● ", Style::default().fg(Color::Green)),
                Span::styled(primary, Style::default().add_modifier(Modifier::BOLD)),
            ]),
            Line::from(Span::styled(format!("   {}", secondary), muted)),
        ]
    } else {
        vec![
            Line::from(" Set your location"),
            Line::from(Span::styled("   Press l to select", muted)),
        ]
    };

    let header = Paragraph::new(lines).block(
        Block::default()
            .title(" Your location ")
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded),
    );
    f.render_widget(header, area);
}

fn render_body(f: &mut Frame, app: &App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let Some(data) = &app.location.data else {
        let p = Paragraph::new("No location yet.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::DarkGray))
            .block(Block::default().borders(Borders::ALL).title(" Address "));
        f.render_widget(p, area);
        return;
    };

    let a = &data.address;
    let rows = [
        ("Building", &a.building_name),
        ("Flat", &a.flat_number),
        ("Street", &a.street),
        ("Number", &a.street_number),
        ("Area", &a.area),
        ("Landmark", &a.landmark),
        ("City", &a.city),
        ("State", &a.state),
        ("Postcode", &a.postal_code),
        ("Country", &a.country),
    ];

    let mut lines: Vec<Line> = rows
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(
                    format!("{:<10}", label),
                    Style::default().add_modifier(Modifier::BOLD),
                ),
                Span::raw(value.as_str()),
            ])
        })
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("Coords    ", Style::default().add_modifier(Modifier::BOLD)),
        Span::styled(data.coords.to_string(), Style::default().fg(Color::Yellow)),
    ]));

    let details = Paragraph::new(lines)
        .wrap(Wrap { trim: true })
        .block(
            Block::default()
                .title(" Address ")
                .borders(Borders::ALL)
                .padding(Padding::new(2, 2, 1, 1)),
        );
    f.render_widget(details, chunks[0]);

    let (lat, lon) = (data.coords.latitude, data.coords.longitude);
    let radius = 2.0;
    let map = Canvas::default()
        .block(Block::bordered().title(" Map "))
        .marker(symbols::Marker::Braille)
        .x_bounds([lon - radius, lon + radius])
        .y_bounds([lat - radius, lat + radius])
        .paint(|ctx| {
            ctx.draw(&Map {
                color: Color::Rgb(50, 50, 50),
                resolution: MapResolution::High,
            });
            ctx.print(
                lon,
                lat,
                Line::from(Span::styled(" ⌖ ", Style::default().fg(Color::Cyan))),
            );
        });
    f.render_widget(map, chunks[1]);
}

/// Rectangle of `percent_x` by `percent_y` centered in `area`.
fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn render_picker(f: &mut Frame, app: &App) {
    let area = centered_rect(70, 70, f.size());
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Select Location ")
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(inner);

    let picker = &app.picker;
    let input = if app.query.is_empty() {
        Span::styled("Search for area, street name...", Style::default().fg(Color::DarkGray))
    } else {
        Span::raw(app.query.as_str())
    };
    let mut search_line = vec![Span::raw(" 🔍 "), input];
    if picker.is_searching {
        search_line.push(Span::styled(
            format!("  {}", SPINNER[app.tick_count % SPINNER.len()]),
            Style::default().fg(Color::Green),
        ));
    }
    f.render_widget(
        Paragraph::new(Line::from(search_line)).block(Block::default().borders(Borders::ALL)),
        chunks[0],
    );

    let highlight = Style::default()
        .fg(Color::Cyan)
        .bg(Color::Rgb(30, 30, 60))
        .add_modifier(Modifier::BOLD);
    let row_style = |i: usize| {
        if i == app.selected_index {
            highlight
        } else {
            Style::default()
        }
    };

    let mut items = vec![ListItem::new(Line::from(vec![
        Span::styled(" ⌖ ", Style::default().fg(Color::Green)),
        Span::raw("Use current location"),
    ]))
    .style(row_style(0))];

    items.extend(picker.predictions.iter().enumerate().map(|(i, p)| {
        let text = &p.structured_formatting;
        ListItem::new(vec![
            Line::from(Span::raw(format!("   {}", text.main_text))),
            Line::from(Span::styled(
                format!("   {}", text.secondary_text),
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .style(row_style(i + 1))
    }));

    f.render_widget(List::new(items), chunks[1]);

    let status = if picker.is_selecting {
        Line::from(Span::styled(" Loading place details...", Style::default().fg(Color::Yellow)))
    } else if let Some(err) = &app.picker_error {
        Line::from(Span::styled(format!(" {}", err), Style::default().fg(Color::Red)))
    } else if app.query.chars().count() >= 2
        && !picker.is_searching
        && picker.predictions.is_empty()
    {
        Line::from(Span::styled(" No places found", Style::default().fg(Color::DarkGray)))
    } else {
        Line::from("")
    };
    f.render_widget(Paragraph::new(status), chunks[2]);
}
