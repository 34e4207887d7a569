///! Standings card renderer
///!
///! Projects the record set and labels into a fixed card layout and
///! serializes it as an SVG document. Everything here is pure: no I/O,
///! no clock, the same input always yields the same SVG.

use serde::{Deserialize, Serialize};
use standings_common::{LabelSet, LayoutVariant, TeamRecord};

use crate::config::RenderConfig;

const STANDINGS_SVG_TEMPLATE: &str = include_str!("../../resources/standings_template.svg");

/// Colour palette used by the card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub accent: String,
    /// Text drawn on top of accent fills (table header)
    pub accent_foreground: String,
    pub secondary: String,
    pub muted: String,
    pub row_dark: String,
    pub row_light: String,
    pub row_text: String,
    pub divider: String,
    pub background_top: String,
    pub background_bottom: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            accent: "#F2A900".to_string(),
            accent_foreground: "#111111".to_string(),
            secondary: "#1F2937".to_string(),
            muted: "#6B7280".to_string(),
            row_dark: "#1E2228".to_string(),
            row_light: "#2A2F37".to_string(),
            row_text: "#FFFFFF".to_string(),
            divider: "#D1D5DB".to_string(),
            background_top: "#F7F5F0".to_string(),
            background_bottom: "#E6E2D8".to_string(),
        }
    }
}

/// Visual tier of a single row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RowTier {
    /// rank <= 7, accent highlight
    Featured,
    Dark,
    Light,
}

impl RowTier {
    fn classify(record: &TeamRecord, index_in_column: usize) -> Self {
        if record.is_featured() {
            RowTier::Featured
        } else if index_in_column % 2 == 0 {
            RowTier::Dark
        } else {
            RowTier::Light
        }
    }
}

/// Content of the "Wins" cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum WinsCell {
    /// Check icon followed by the count
    Count(i64),
    /// Placeholder when the team has no first place finish
    Dash,
}

impl WinsCell {
    pub const DASH: &'static str = "–";
    pub const ICON: &'static str = "✓";

    pub fn for_wins(first_place_wins: i64) -> Self {
        if first_place_wins > 0 {
            WinsCell::Count(first_place_wins)
        } else {
            WinsCell::Dash
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingsRow {
    pub record: TeamRecord,
    pub tier: RowTier,
    pub wins: WinsCell,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CardHeader {
    pub title: String,
    pub subtitle: String,
    /// First word of the period label, drawn large in the accent colour
    pub period_lead: String,
    /// Second word of the period label
    pub period_trail: String,
}

/// Split "OVERALL STANDINGS" into ("OVERALL", "STANDINGS").
///
/// Only the first two space-separated words are shown; consecutive spaces
/// produce an empty second word.
pub fn split_period_label(label: &str) -> (String, String) {
    let mut words = label.split(' ');
    let lead = words.next().unwrap_or("").to_string();
    let trail = words.next().unwrap_or("").to_string();
    (lead, trail)
}

/// Split rows for the two-column variant: the left side gets ceil(n/2).
pub fn split_columns<T>(items: &[T]) -> (&[T], &[T]) {
    items.split_at(items.len().div_ceil(2))
}

/// Computed card layout, independent of any drawing backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StandingsLayout {
    pub header: CardHeader,
    pub variant: LayoutVariant,
    /// One entry for the single column variant, two for the split variant
    pub columns: Vec<Vec<StandingsRow>>,
    pub footer_text: String,
}

impl StandingsLayout {
    pub fn build(
        records: &[TeamRecord],
        labels: &LabelSet,
        variant: LayoutVariant,
        footer_text: &str,
    ) -> Self {
        let (period_lead, period_trail) = split_period_label(&labels.period_label);

        let column_slices: Vec<&[TeamRecord]> = match variant {
            LayoutVariant::SingleColumn => vec![records],
            LayoutVariant::TwoColumn => {
                let (left, right) = split_columns(records);
                vec![left, right]
            }
        };

        let columns = column_slices
            .into_iter()
            .map(|slice| {
                slice
                    .iter()
                    .enumerate()
                    .map(|(i, record)| StandingsRow {
                        record: record.clone(),
                        tier: RowTier::classify(record, i),
                        wins: WinsCell::for_wins(record.first_place_wins),
                    })
                    .collect()
            })
            .collect();

        Self {
            header: CardHeader {
                title: labels.title.clone(),
                subtitle: labels.subtitle.clone(),
                period_lead,
                period_trail,
            },
            variant,
            columns,
            footer_text: footer_text.to_string(),
        }
    }

    /// Rows in display order (left column first)
    pub fn rows(&self) -> impl Iterator<Item = &StandingsRow> {
        self.columns.iter().flatten()
    }

    pub fn row_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Card size in SVG user units (before export scaling)
    pub fn card_size(&self) -> (f32, f32) {
        let width = match self.variant {
            LayoutVariant::SingleColumn => CardGeometry::SINGLE_WIDTH,
            LayoutVariant::TwoColumn => CardGeometry::TWO_COLUMN_WIDTH,
        };
        let tallest = self.columns.iter().map(Vec::len).max().unwrap_or(0);
        let height = CardGeometry::footer_y(tallest) + CardGeometry::FOOTER_HEIGHT + CardGeometry::PADDING;
        (width, height)
    }

    /// Serialize the layout as a standalone SVG document.
    pub fn to_svg(&self, theme: &Theme, font_family: &str) -> String {
        let (width, height) = self.card_size();
        let table_width = CardGeometry::table_width(width, self.columns.len());

        let mut content = self.header_svg(theme, width);

        for (col, rows) in self.columns.iter().enumerate() {
            let x = CardGeometry::PADDING + col as f32 * (table_width + CardGeometry::COLUMN_GAP);
            content.push_str(&table_header_svg(theme, x, table_width));
            content.push_str(&rows_svg(theme, rows, x, table_width));
        }

        let tallest = self.columns.iter().map(Vec::len).max().unwrap_or(0);
        content.push_str(&self.footer_svg(theme, width, CardGeometry::footer_y(tallest)));

        // User text lands in CONTENT, which must be substituted last
        STANDINGS_SVG_TEMPLATE
            .replace("{{SVG_WIDTH}}", &format!("{:.0}", width))
            .replace("{{SVG_HEIGHT}}", &format!("{:.0}", height))
            .replace("{{FONT_FAMILY}}", &escape_xml(font_family))
            .replace("{{BG_TOP}}", &theme.background_top)
            .replace("{{BG_BOTTOM}}", &theme.background_bottom)
            .replace("{{ACCENT_FG}}", &theme.accent_foreground)
            .replace("{{ACCENT}}", &theme.accent)
            .replace("{{SECONDARY}}", &theme.secondary)
            .replace("{{MUTED}}", &theme.muted)
            .replace("{{ROW_TEXT}}", &theme.row_text)
            .replace("{{CONTENT}}", &content)
    }

    fn header_svg(&self, theme: &Theme, width: f32) -> String {
        let g = CardGeometry::PADDING;
        let right = width - g;

        let mut period = format!(
            r#"<tspan class="period-lead">{}</tspan>"#,
            escape_xml(&self.header.period_lead.to_uppercase())
        );
        if !self.header.period_trail.is_empty() {
            period.push_str(&format!(
                r#"<tspan dx="24" class="period-trail">{}</tspan>"#,
                escape_xml(&self.header.period_trail.to_uppercase())
            ));
        }

        format!(
            r#"  <g id="header">
    <text x="{g}" y="{title_y}" class="title">{title}</text>
    <text x="{g}" y="{subtitle_y}" class="subtitle">{subtitle}</text>
    <text x="{right}" y="{period_y}" text-anchor="end">{period}</text>
    <rect x="{g}" y="{rule_y}" width="{rule_w}" height="{rule_h}" fill="{accent}"/>
  </g>
"#,
            g = g,
            title_y = CardGeometry::TITLE_Y,
            title = escape_xml(&self.header.title.to_uppercase()),
            subtitle_y = CardGeometry::SUBTITLE_Y,
            subtitle = escape_xml(&self.header.subtitle.to_uppercase()),
            right = right,
            period_y = CardGeometry::PERIOD_Y,
            period = period,
            rule_y = CardGeometry::RULE_Y,
            rule_w = width - 2.0 * g,
            rule_h = CardGeometry::RULE_HEIGHT,
            accent = theme.accent,
        )
    }

    fn footer_svg(&self, theme: &Theme, width: f32, footer_y: f32) -> String {
        let g = CardGeometry::PADDING;
        format!(
            r#"  <g id="footer">
    <rect x="{g}" y="{y}" width="{w}" height="2" fill="{divider}"/>
    <text x="{cx}" y="{ty}" text-anchor="middle" class="footer-text">{text}</text>
  </g>
"#,
            g = g,
            y = footer_y,
            w = width - 2.0 * g,
            divider = theme.divider,
            cx = width / 2.0,
            ty = footer_y + CardGeometry::FOOTER_HEIGHT - 8.0,
            text = escape_xml(&self.footer_text.to_uppercase()),
        )
    }
}

/// Fixed card geometry, in SVG user units
struct CardGeometry;

impl CardGeometry {
    const SINGLE_WIDTH: f32 = 1200.0;
    const TWO_COLUMN_WIDTH: f32 = 1800.0;
    const PADDING: f32 = 48.0;
    const COLUMN_GAP: f32 = 48.0;

    const TITLE_Y: f32 = 72.0;
    const SUBTITLE_Y: f32 = 96.0;
    const PERIOD_Y: f32 = 110.0;
    const RULE_Y: f32 = 136.0;
    const RULE_HEIGHT: f32 = 4.0;

    const TABLE_TOP: f32 = 164.0;
    const HEAD_HEIGHT: f32 = 44.0;
    const HEAD_GAP: f32 = 8.0;
    const ROW_HEIGHT: f32 = 56.0;
    const ROW_GAP: f32 = 4.0;
    const CELL_GAP: f32 = 8.0;
    const GRID_UNITS: f32 = 7.0;
    const BORDER_WIDTH: f32 = 4.0;

    const FOOTER_MARGIN: f32 = 32.0;
    const FOOTER_HEIGHT: f32 = 48.0;

    /// (start unit, span) for #, Team Name, Wins, Place, Kills, Total
    const SLOTS: [(f32, f32); 6] = [(0.0, 1.0), (1.0, 2.0), (3.0, 1.0), (4.0, 1.0), (5.0, 1.0), (6.0, 1.0)];
    const HEADINGS: [&'static str; 6] = ["#", "TEAM NAME", "WINS", "PLACE PTS.", "KILLS PTS.", "TOTAL PTS."];

    fn table_width(card_width: f32, columns: usize) -> f32 {
        let columns = columns.max(1) as f32;
        (card_width - 2.0 * Self::PADDING - (columns - 1.0) * Self::COLUMN_GAP) / columns
    }

    /// (x, width) of a grid slot relative to the table origin
    fn slot(table_width: f32, slot: (f32, f32)) -> (f32, f32) {
        let unit = (table_width - (Self::GRID_UNITS - 1.0) * Self::CELL_GAP) / Self::GRID_UNITS;
        let (start, span) = slot;
        let x = start * (unit + Self::CELL_GAP);
        let w = span * unit + (span - 1.0) * Self::CELL_GAP;
        (x, w)
    }

    fn body_top() -> f32 {
        Self::TABLE_TOP + Self::HEAD_HEIGHT + Self::HEAD_GAP
    }

    fn footer_y(rows: usize) -> f32 {
        Self::body_top() + rows as f32 * (Self::ROW_HEIGHT + Self::ROW_GAP) + Self::FOOTER_MARGIN
    }
}

fn table_header_svg(theme: &Theme, table_x: f32, table_width: f32) -> String {
    let mut out = String::from("  <g class=\"table-header\">\n");
    let cy = CardGeometry::TABLE_TOP + CardGeometry::HEAD_HEIGHT / 2.0;

    for (slot, heading) in CardGeometry::SLOTS.iter().zip(CardGeometry::HEADINGS) {
        let (sx, sw) = CardGeometry::slot(table_width, *slot);
        let cx = table_x + sx + sw / 2.0;
        // Slanted label plate
        out.push_str(&format!(
            r#"    <g transform="translate({cx:.1} {cy:.1}) skewX(-2)"><rect x="{rx:.1}" y="{ry:.1}" width="{w:.1}" height="{h:.1}" fill="{fill}"/><text x="0" y="0" text-anchor="middle" dominant-baseline="central" class="head-cell">{label}</text></g>
"#,
            cx = cx,
            cy = cy,
            rx = -sw / 2.0,
            ry = -CardGeometry::HEAD_HEIGHT / 2.0,
            w = sw,
            h = CardGeometry::HEAD_HEIGHT,
            fill = theme.accent,
            label = escape_xml(heading),
        ));
    }

    out.push_str("  </g>\n");
    out
}

fn rows_svg(theme: &Theme, rows: &[StandingsRow], table_x: f32, table_width: f32) -> String {
    let mut out = String::new();

    for (i, row) in rows.iter().enumerate() {
        let y = CardGeometry::body_top() + i as f32 * (CardGeometry::ROW_HEIGHT + CardGeometry::ROW_GAP);
        let mid_y = y + CardGeometry::ROW_HEIGHT / 2.0;
        let record = &row.record;

        let (fill, tone) = match row.tier {
            RowTier::Featured => ("url(#featured-bg)", "featured"),
            RowTier::Dark => (theme.row_dark.as_str(), "plain"),
            RowTier::Light => (theme.row_light.as_str(), "plain"),
        };

        out.push_str(&format!(
            r#"  <g class="row row-{tier}">
    <rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{fill}"/>
"#,
            tier = tone,
            x = table_x,
            y = y,
            w = table_width,
            h = CardGeometry::ROW_HEIGHT,
            fill = fill,
        ));

        if row.tier == RowTier::Featured {
            out.push_str(&format!(
                r#"    <rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{accent}"/>
"#,
                x = table_x,
                y = y,
                w = CardGeometry::BORDER_WIDTH,
                h = CardGeometry::ROW_HEIGHT,
                accent = theme.accent,
            ));
        }

        let center = |slot: usize| {
            let (sx, sw) = CardGeometry::slot(table_width, CardGeometry::SLOTS[slot]);
            table_x + sx + sw / 2.0
        };

        // Rank
        out.push_str(&centered_text(center(0), mid_y, &format!("rank {}", tone), &record.rank.to_string()));

        // Team name, left aligned inside its two-unit slot
        let (name_x, _) = CardGeometry::slot(table_width, CardGeometry::SLOTS[1]);
        out.push_str(&format!(
            r#"    <text x="{x:.1}" y="{my:.1}" dominant-baseline="central" class="team {tone}">{v}</text>
"#,
            x = table_x + name_x + 16.0,
            my = mid_y,
            tone = tone,
            v = escape_xml(&record.team_name.to_uppercase()),
        ));

        // Wins
        match row.wins {
            WinsCell::Count(n) => out.push_str(&format!(
                r#"    <text x="{x:.1}" y="{my:.1}" text-anchor="middle" dominant-baseline="central"><tspan class="wins-icon">{icon}</tspan><tspan dx="8" class="wins">{n}</tspan></text>
"#,
                x = center(2),
                my = mid_y,
                icon = WinsCell::ICON,
                n = n,
            )),
            WinsCell::Dash => out.push_str(&centered_text(center(2), mid_y, "wins", WinsCell::DASH)),
        }

        out.push_str(&centered_text(center(3), mid_y, &format!("stat {}", tone), &record.placement_points.to_string()));
        out.push_str(&centered_text(center(4), mid_y, &format!("stat {}", tone), &record.kill_points.to_string()));
        out.push_str(&centered_text(center(5), mid_y, "total", &record.total_points.to_string()));

        out.push_str("  </g>\n");
    }

    out
}

fn centered_text(x: f32, y: f32, class: &str, value: &str) -> String {
    format!(
        r#"    <text x="{x:.1}" y="{y:.1}" text-anchor="middle" dominant-baseline="central" class="{class}">{v}</text>
"#,
        x = x,
        y = y,
        class = class,
        v = escape_xml(value),
    )
}

/// Escape markup and drop characters XML 1.0 cannot carry at all.
fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\t' | '\n' | '\r' => out.push(c),
            c if c < '\u{20}' => {}
            '\u{FFFE}' | '\u{FFFF}' => {}
            c => out.push(c),
        }
    }
    out
}

/// A computed layout together with its serialized SVG
#[derive(Debug, Clone)]
pub struct RenderedCard {
    pub layout: StandingsLayout,
    pub svg: String,
    pub width: u32,
    pub height: u32,
}

impl RenderedCard {
    pub fn row_count(&self) -> usize {
        self.layout.row_count()
    }

    pub fn has_content(&self) -> bool {
        !self.layout.is_empty()
    }
}

/// Standings renderer
pub struct StandingsRenderer {
    theme: Theme,
    font_family: String,
    footer_text: String,
}

impl StandingsRenderer {
    pub const DEFAULT_FOOTER: &'static str = "PUBG Mobile Tournament";

    pub fn new(theme: Theme, font_family: impl Into<String>, footer_text: impl Into<String>) -> Self {
        Self {
            theme,
            font_family: font_family.into(),
            footer_text: footer_text.into(),
        }
    }

    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.theme.clone(), &config.font_family, &config.footer_text)
    }

    pub fn render(
        &self,
        records: &[TeamRecord],
        labels: &LabelSet,
        variant: LayoutVariant,
    ) -> RenderedCard {
        let layout = StandingsLayout::build(records, labels, variant, &self.footer_text);
        let svg = layout.to_svg(&self.theme, &self.font_family);
        let (width, height) = layout.card_size();

        RenderedCard {
            layout,
            svg,
            width: width.round() as u32,
            height: height.round() as u32,
        }
    }
}

impl Default for StandingsRenderer {
    fn default() -> Self {
        Self::new(Theme::default(), "Consolas", Self::DEFAULT_FOOTER)
    }
}
