//! The reading surface: which subtree is mounted for which view mode, and
//! where the interactive targets land on screen.
//!
//! `render` is a pure function of its props. It paints the frame and hands
//! back a `PageRegions` describing every hit target; the event loop resolves
//! clicks against that, in the same priority order a click would bubble
//! through the layered layout.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::Frame;
use unicode_width::UnicodeWidthStr;

use crate::data::{ArticleService, FeedService};
use crate::resize::UNITS_PER_CELL;

pub const COLOR_BG: Color = Color::Rgb(30, 30, 46);
pub const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
pub const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
pub const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
pub const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
pub const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
pub const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
pub const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
pub const COLOR_SELECTED_BG: Color = Color::Rgb(69, 71, 90);

const ICON_BACK: &str = "◂";
const ICON_FORWARD: &str = "▸";

/// Minimum sensible article panel width on screen, in cells.
const MIN_PANEL_CELLS: u16 = 24;
const NAV_BUTTON_WIDTH: u16 = 5;
const NAV_BUTTON_HEIGHT: u16 = 3;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewMode {
    Cards,
    Magazine,
    Compact,
    List,
}

impl ViewMode {
    pub fn is_list(self) -> bool {
        matches!(self, ViewMode::List)
    }

    pub fn label(self) -> &'static str {
        match self {
            ViewMode::Cards => "cards",
            ViewMode::Magazine => "magazine",
            ViewMode::Compact => "compact",
            ViewMode::List => "list",
        }
    }

    pub fn next(self) -> Self {
        match self {
            ViewMode::Cards => ViewMode::Magazine,
            ViewMode::Magazine => ViewMode::Compact,
            ViewMode::Compact => ViewMode::List,
            ViewMode::List => ViewMode::Cards,
        }
    }

    /// Parse a persisted value; anything unrecognized restores `Cards`.
    pub fn from_setting(value: Option<&str>) -> Self {
        match value {
            Some("magazine") => ViewMode::Magazine,
            Some("compact") => ViewMode::Compact,
            Some("list") => ViewMode::List,
            _ => ViewMode::Cards,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChromeFlags {
    pub menu: bool,
    pub context_menu: bool,
    pub settings: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OpenItem {
    pub id: u64,
    pub from_feed: bool,
}

/// Per-cell render state (selection and scroll). Cells are looked up by
/// `cell_key`, so grid-mode state is discarded on a mode switch while
/// list-mode state survives.
#[derive(Clone, Copy, Debug, Default)]
pub struct CellState {
    pub selected: usize,
    pub offset: usize,
}

/// Grid-like modes suffix the key with the mode so a mode switch remounts
/// the cell; list mode keys by id alone so cell state is reused.
pub fn cell_key(feed_id: &str, view: ViewMode) -> String {
    if view.is_list() {
        feed_id.to_string()
    } else {
        format!("{}|{}", feed_id, view.label())
    }
}

pub struct PageProps<'a> {
    pub view: ViewMode,
    pub chrome: ChromeFlags,
    pub feeds: &'a [String],
    pub open_item: Option<OpenItem>,
    pub article_width: u16,
    pub focused_feed: usize,
    pub search_query: &'a str,
    pub search_active: bool,
    pub article_scroll: u16,
    pub theme: &'a str,
}

pub struct Collaborators<'a> {
    pub feeds: &'a dyn FeedService,
    pub articles: &'a dyn ArticleService,
}

/// Where a click lands, highest-priority target first. Resolving a handle
/// or a nav button before the panel and the panel before the backdrop is
/// what keeps a resize grab or a next-click from also dismissing the
/// article.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageHit {
    HandleLeft,
    HandleRight,
    PrevButton,
    NextButton,
    Panel,
    Backdrop,
    Search,
    FeedCell(usize),
    Miss,
}

#[derive(Clone, Debug, Default)]
pub struct PageRegions {
    pub search: Option<Rect>,
    pub feed_cells: Vec<(String, Rect)>,
    pub backdrop: Option<Rect>,
    pub panel: Option<Rect>,
    pub handle_left: Option<Rect>,
    pub handle_right: Option<Rect>,
    pub prev_button: Option<Rect>,
    pub next_button: Option<Rect>,
}

fn contains(rect: Rect, column: u16, row: u16) -> bool {
    column >= rect.x
        && column < rect.x + rect.width
        && row >= rect.y
        && row < rect.y + rect.height
}

impl PageRegions {
    pub fn hit(&self, column: u16, row: u16) -> PageHit {
        let ordered = [
            (self.handle_left, PageHit::HandleLeft),
            (self.handle_right, PageHit::HandleRight),
            (self.prev_button, PageHit::PrevButton),
            (self.next_button, PageHit::NextButton),
            (self.panel, PageHit::Panel),
            (self.backdrop, PageHit::Backdrop),
            (self.search, PageHit::Search),
        ];
        for (region, hit) in ordered {
            if region.is_some_and(|rect| contains(rect, column, row)) {
                return hit;
            }
        }
        for (idx, (_, rect)) in self.feed_cells.iter().enumerate() {
            if contains(*rect, column, row) {
                return PageHit::FeedCell(idx);
            }
        }
        PageHit::Miss
    }
}

pub fn render(
    frame: &mut Frame<'_>,
    area: Rect,
    props: &PageProps<'_>,
    collab: &Collaborators<'_>,
    cells: &mut HashMap<String, CellState>,
) -> PageRegions {
    // Settings owns the whole region; nothing of the page is mounted.
    if props.chrome.settings {
        return PageRegions::default();
    }

    if props.view.is_list() {
        render_list(frame, area, props, collab, cells)
    } else {
        render_grid(frame, area, props, collab, cells)
    }
}

fn render_grid(
    frame: &mut Frame<'_>,
    area: Rect,
    props: &PageProps<'_>,
    collab: &Collaborators<'_>,
    cells: &mut HashMap<String, CellState>,
) -> PageRegions {
    let mut regions = PageRegions::default();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);
    draw_search_bar(frame, rows[0], props);
    regions.search = Some(rows[0]);

    let grid = rows[1];
    if !props.feeds.is_empty() {
        let share = (100 / props.feeds.len().max(1)) as u16;
        let constraints: Vec<Constraint> = props
            .feeds
            .iter()
            .map(|_| Constraint::Percentage(share))
            .collect();
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(constraints)
            .split(grid);
        for (idx, (feed_id, cell_area)) in props.feeds.iter().zip(columns.iter()).enumerate() {
            let key = cell_key(feed_id, props.view);
            let state = cells.entry(key.clone()).or_default();
            draw_feed_cell(
                frame,
                *cell_area,
                props,
                collab,
                feed_id,
                state,
                idx == props.focused_feed,
            );
            regions.feed_cells.push((key, *cell_area));
        }
    }

    if let Some(open) = props.open_item {
        render_overlay(frame, grid, props, collab, open, &mut regions);
    }

    regions
}

/// The floating article layer. The backdrop covers the whole grid; the
/// panel floats centered at the width the resize controller dictates, with
/// a one-column grab handle on each edge.
fn render_overlay(
    frame: &mut Frame<'_>,
    area: Rect,
    props: &PageProps<'_>,
    collab: &Collaborators<'_>,
    open: OpenItem,
    regions: &mut PageRegions,
) {
    regions.backdrop = Some(area);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Block::default().style(Style::default().bg(COLOR_BG)),
        area,
    );

    let desired = props.article_width / UNITS_PER_CELL;
    let panel_width = desired
        .max(MIN_PANEL_CELLS)
        .min(area.width.saturating_sub(2));
    let panel_height = area.height.saturating_sub(2);
    let panel = Rect {
        x: area.x + (area.width.saturating_sub(panel_width)) / 2,
        y: area.y + (area.height.saturating_sub(panel_height)) / 2,
        width: panel_width,
        height: panel_height,
    };
    regions.panel = Some(panel);

    let border_color = if props.chrome.context_menu {
        COLOR_BORDER_IDLE
    } else {
        COLOR_BORDER_FOCUSED
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .style(Style::default().bg(COLOR_PANEL_BG))
        .padding(Padding::horizontal(1));
    let inner = block.inner(panel);
    frame.render_widget(block, panel);
    draw_article_body(frame, inner, props, collab, open.id);

    // The border columns double as the grab handles.
    if panel.width >= 2 && panel.height > 0 {
        regions.handle_left = Some(Rect {
            x: panel.x,
            y: panel.y,
            width: 1,
            height: panel.height,
        });
        regions.handle_right = Some(Rect {
            x: panel.x + panel.width - 1,
            y: panel.y,
            width: 1,
            height: panel.height,
        });
    }

    if open.from_feed {
        let mid_y = area.y + area.height.saturating_sub(NAV_BUTTON_HEIGHT) / 2;
        if panel.x >= area.x + NAV_BUTTON_WIDTH + 1 {
            let prev = Rect {
                x: panel.x.saturating_sub(NAV_BUTTON_WIDTH + 1),
                y: mid_y,
                width: NAV_BUTTON_WIDTH,
                height: NAV_BUTTON_HEIGHT,
            };
            draw_nav_button(frame, prev, ICON_BACK);
            regions.prev_button = Some(prev);
        }
        let panel_right = panel.x + panel.width;
        if panel_right + NAV_BUTTON_WIDTH + 1 <= area.x + area.width {
            let next = Rect {
                x: panel_right + 1,
                y: mid_y,
                width: NAV_BUTTON_WIDTH,
                height: NAV_BUTTON_HEIGHT,
            };
            draw_nav_button(frame, next, ICON_FORWARD);
            regions.next_button = Some(next);
        }
    }
}

fn render_list(
    frame: &mut Frame<'_>,
    area: Rect,
    props: &PageProps<'_>,
    collab: &Collaborators<'_>,
    cells: &mut HashMap<String, CellState>,
) -> PageRegions {
    let mut regions = PageRegions::default();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(0)])
        .split(area);
    draw_search_bar(frame, rows[0], props);
    regions.search = Some(rows[0]);

    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(38), Constraint::Percentage(62)])
        .split(rows[1]);

    if !props.feeds.is_empty() {
        let share = (100 / props.feeds.len().max(1)) as u16;
        let constraints: Vec<Constraint> = props
            .feeds
            .iter()
            .map(|_| Constraint::Percentage(share))
            .collect();
        let stacked = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(halves[0]);
        for (idx, (feed_id, cell_area)) in props.feeds.iter().zip(stacked.iter()).enumerate() {
            let key = cell_key(feed_id, props.view);
            let state = cells.entry(key.clone()).or_default();
            draw_feed_cell(
                frame,
                *cell_area,
                props,
                collab,
                feed_id,
                state,
                idx == props.focused_feed,
            );
            regions.feed_cells.push((key, *cell_area));
        }
    }

    let side = halves[1];
    if let Some(open) = props.open_item {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_IDLE))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::horizontal(1));
        let inner = block.inner(side);
        frame.render_widget(block, side);
        draw_article_body(frame, inner, props, collab, open.id);
        regions.panel = Some(side);
    } else {
        draw_placeholder_logo(frame, side, props.theme);
    }

    regions
}

fn draw_search_bar(frame: &mut Frame<'_>, area: Rect, props: &PageProps<'_>) {
    let (text, style) = if props.search_active {
        (
            format!(" / {}▏", props.search_query),
            Style::default().fg(COLOR_ACCENT).bg(COLOR_PANEL_FOCUSED_BG),
        )
    } else if props.search_query.is_empty() {
        (
            " / search".to_string(),
            Style::default().fg(COLOR_TEXT_SECONDARY).bg(COLOR_PANEL_BG),
        )
    } else {
        (
            format!(" / {}", props.search_query),
            Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_PANEL_BG),
        )
    };
    frame.render_widget(Paragraph::new(text).style(style), area);
}

fn draw_feed_cell(
    frame: &mut Frame<'_>,
    area: Rect,
    props: &PageProps<'_>,
    collab: &Collaborators<'_>,
    feed_id: &str,
    state: &mut CellState,
    focused: bool,
) {
    let border_style = if focused {
        Style::default().fg(COLOR_BORDER_FOCUSED)
    } else {
        Style::default().fg(COLOR_BORDER_IDLE)
    };
    let title = collab.feeds.feed_title(feed_id);
    let block = Block::default()
        .title(Span::styled(
            format!(" {title} "),
            if focused {
                Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_SECONDARY)
            },
        ))
        .borders(Borders::ALL)
        .border_style(border_style)
        .style(Style::default().bg(COLOR_PANEL_BG));
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    let items = match collab.feeds.items(feed_id) {
        Ok(items) => items,
        Err(err) => {
            let msg = Paragraph::new(format!("{err:#}"))
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .wrap(Wrap { trim: true });
            frame.render_widget(msg, inner);
            return;
        }
    };
    let query = props.search_query.to_lowercase();
    let visible: Vec<_> = items
        .iter()
        .filter(|item| query.is_empty() || item.title.to_lowercase().contains(&query))
        .collect();
    if visible.is_empty() {
        let msg = Paragraph::new("no items").style(Style::default().fg(COLOR_TEXT_SECONDARY));
        frame.render_widget(msg, inner);
        return;
    }

    state.selected = state.selected.min(visible.len() - 1);
    let rows_per_item: usize = match props.view {
        ViewMode::Compact | ViewMode::List => 1,
        ViewMode::Cards | ViewMode::Magazine => 2,
    };
    let capacity = (inner.height as usize / rows_per_item).max(1);
    if state.selected < state.offset {
        state.offset = state.selected;
    } else if state.selected >= state.offset + capacity {
        state.offset = state.selected + 1 - capacity;
    }

    let mut lines: Vec<Line> = Vec::new();
    for (idx, item) in visible
        .iter()
        .enumerate()
        .skip(state.offset)
        .take(capacity)
    {
        let selected = idx == state.selected;
        let row_style = if selected && focused {
            Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_SELECTED_BG)
        } else if selected {
            Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_PANEL_FOCUSED_BG)
        } else {
            Style::default().fg(COLOR_TEXT_PRIMARY)
        };
        lines.push(Line::styled(
            truncate_to_width(&item.title, inner.width as usize),
            row_style,
        ));
        if rows_per_item == 2 {
            let meta = format!("{} · {}", item.source, item.published.format("%b %e"));
            lines.push(Line::styled(
                truncate_to_width(&meta, inner.width as usize),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ));
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn draw_article_body(
    frame: &mut Frame<'_>,
    area: Rect,
    props: &PageProps<'_>,
    collab: &Collaborators<'_>,
    item_id: u64,
) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let text = match collab.articles.article(item_id) {
        Ok(article) => {
            let mut lines = vec![
                Line::styled(
                    article.title.clone(),
                    Style::default()
                        .fg(COLOR_TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                ),
                Line::styled(
                    article.source.clone(),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                ),
                Line::default(),
            ];
            for wrapped in textwrap::wrap(&article.body, area.width.max(1) as usize) {
                lines.push(Line::styled(
                    wrapped.into_owned(),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                ));
            }
            Text::from(lines)
        }
        Err(err) => Text::styled(
            format!("{err}"),
            Style::default().fg(COLOR_TEXT_SECONDARY),
        ),
    };
    let body = Paragraph::new(text).scroll((props.article_scroll, 0));
    frame.render_widget(body, area);
}

fn draw_nav_button(frame: &mut Frame<'_>, area: Rect, glyph: &str) {
    let button = Paragraph::new(glyph)
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_BORDER_IDLE)),
        )
        .style(Style::default().fg(COLOR_ACCENT).bg(COLOR_PANEL_BG));
    frame.render_widget(button, area);
}

static LOGO_DARK: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        " ██╗     ███████╗ ██████╗████████╗ ██████╗ ██████╗ ",
        " ██║     ██╔════╝██╔════╝╚══██╔══╝██╔═══██╗██╔══██╗",
        " ██║     █████╗  ██║        ██║   ██║   ██║██████╔╝",
        " ██║     ██╔══╝  ██║        ██║   ██║   ██║██╔══██╗",
        " ███████╗███████╗╚██████╗   ██║   ╚██████╔╝██║  ██║",
        " ╚══════╝╚══════╝ ╚═════╝   ╚═╝    ╚═════╝ ╚═╝  ╚═╝",
    ]
});

static LOGO_LIGHT: Lazy<Vec<&'static str>> = Lazy::new(|| {
    vec![
        " _              _             ",
        "| |    ___  ___| |_ ___  _ __ ",
        "| |   / _ \\/ __| __/ _ \\| '__|",
        "| |__|  __/ (__| || (_) | |   ",
        "|_____\\___|\\___|\\__\\___/|_|   ",
    ]
});

fn draw_placeholder_logo(frame: &mut Frame<'_>, area: Rect, theme: &str) {
    let art: &[&str] = if theme == "light" {
        &LOGO_LIGHT
    } else {
        &LOGO_DARK
    };
    let lines: Vec<Line> = art
        .iter()
        .map(|row| Line::styled(*row, Style::default().fg(COLOR_BORDER_IDLE)))
        .collect();
    let top_pad = area.height.saturating_sub(lines.len() as u16) / 2;
    let logo = Paragraph::new(lines).alignment(Alignment::Center);
    let centered = Rect {
        x: area.x,
        y: area.y + top_pad,
        width: area.width,
        height: area.height.saturating_sub(top_pad),
    };
    frame.render_widget(
        Block::default().style(Style::default().bg(COLOR_PANEL_BG)),
        area,
    );
    frame.render_widget(logo, centered);
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = ch.to_string().width();
        if used + ch_width + 1 > width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.push('…');
    out
}
