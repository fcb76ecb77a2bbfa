//! Panel widgets for the six-panel dashboard
//!
//! Render functions take already-shaped panel data and a theme; the only
//! logic here is presentation (bars, icons, truncation).

use gcic_core::{CronStatus, EventLevel, Rate, Severity};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::data::{
    ActivityPanelData, AgentPanelData, CronPanelData, DashboardData, SecurityPanelData,
    ServerPanelData, SitrepPanelData,
};
use crate::theme::{Role, Theme};

/// Usage bar as block glyphs, htop style
fn usage_bar(percent: f64, width: usize) -> String {
    let filled = ((percent / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    "█".repeat(filled) + &"░".repeat(width - filled)
}

/// Role for a usage percentage: error at 90%, warning at 70%
fn usage_role(percent: f64) -> Role {
    if percent >= 90.0 {
        Role::Error
    } else if percent >= 70.0 {
        Role::Warning
    } else {
        Role::Normal
    }
}

/// Compact token figure: 359000 -> "359k"
fn format_tokens(tokens: u64) -> String {
    if tokens >= 1000 {
        format!("{}k", tokens / 1000)
    } else {
        tokens.to_string()
    }
}

fn format_bytes(bytes: u64) -> String {
    if bytes >= 1_073_741_824 {
        format!("{:.1}G", bytes as f64 / 1_073_741_824.0)
    } else if bytes >= 1_048_576 {
        format!("{:.0}M", bytes as f64 / 1_048_576.0)
    } else if bytes >= 1024 {
        format!("{:.0}K", bytes as f64 / 1024.0)
    } else {
        format!("{}B", bytes)
    }
}

/// Short age string for stale annotations
fn format_age(secs: f64) -> String {
    let secs = secs.max(0.0) as u64;
    if secs >= 3600 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

fn panel_block<'a>(title: String, theme: &Theme, focused: bool) -> Block<'a> {
    let border_style = if focused {
        theme.style(Role::Highlight)
    } else {
        theme.style(Role::Dim)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(title, theme.style(Role::Header)))
}

/// Data older than twice its tier interval gets an age tag in the title
fn staleness_tag(now: f64, ts: f64, tier_secs: f64) -> Option<String> {
    let age = now - ts;
    if age > tier_secs * 2.0 {
        Some(format!(" ({} old)", format_age(age)))
    } else {
        None
    }
}

pub fn render_agents(
    f: &mut Frame,
    area: Rect,
    data: &AgentPanelData,
    now: f64,
    theme: &Theme,
    focused: bool,
) {
    let mut title = " AGENT FLEET [1] ".to_string();
    if let Some(snapshot) = data.agents.first() {
        if let Some(tag) = staleness_tag(now, snapshot.timestamp, 300.0) {
            title.push_str(&tag);
        }
    }

    let mut lines = Vec::new();
    if data.agents.is_empty() {
        lines.push(Line::from(Span::styled(
            "  N/A - no agent data",
            theme.style(Role::Dim),
        )));
    } else {
        for snapshot in &data.agents {
            let record = &snapshot.record;
            let marker = if record.is_default { "*" } else { " " };
            let rate = data.rate_for(&record.name);
            let rate_text = match rate {
                Rate::PerHour(n) => format!("{}/h", format_tokens(n.max(0) as u64)),
                Rate::Unknown => "--".to_string(),
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  {}{:<12}", marker, record.name),
                    theme.style(Role::Highlight),
                ),
                Span::styled(format!("{:<14}", record.model), theme.style(Role::Dim)),
                Span::styled(
                    format!(
                        "{:>2} sess  {:>6}  {:>6}  {:>8}",
                        record.sessions,
                        format_tokens(record.tokens_used),
                        format_bytes(record.storage_bytes),
                        rate_text,
                    ),
                    theme.style(Role::Normal),
                ),
            ]));
        }

        lines.push(Line::default());
        let total_rate = if data.rates.per_agent.iter().any(|(_, r)| r.numeric().is_some()) {
            format!("{}/h", format_tokens(data.rates.total.max(0) as u64))
        } else {
            "--".to_string()
        };
        lines.push(Line::from(vec![
            Span::styled("  Sessions: ", theme.style(Role::Dim)),
            Span::styled(
                format!("{}", data.total_sessions()),
                theme.style(Role::Normal),
            ),
            Span::styled("   Total: ", theme.style(Role::Dim)),
            Span::styled(
                format_tokens(data.total_tokens()),
                theme.style(Role::Normal),
            ),
            Span::styled("   Rate: ", theme.style(Role::Dim)),
            Span::styled(total_rate, theme.style(Role::Normal)),
        ]));
    }

    if let Some(platform) = &data.platform {
        let status = &platform.value;
        let gateway_role = if status.gateway == "running" {
            Role::Normal
        } else {
            Role::Warning
        };
        lines.push(Line::from(vec![
            Span::styled("  Model: ", theme.style(Role::Dim)),
            Span::styled(status.model.clone(), theme.style(Role::Normal)),
            Span::styled("   Gateway: ", theme.style(Role::Dim)),
            Span::styled(status.gateway.clone(), theme.style(gateway_role)),
        ]));
    }

    let paragraph = Paragraph::new(lines).block(panel_block(title, theme, focused));
    f.render_widget(paragraph, area);
}

pub fn render_server(
    f: &mut Frame,
    area: Rect,
    data: &ServerPanelData,
    now: f64,
    theme: &Theme,
    focused: bool,
) {
    let mut title = " SERVER HEALTH [2] ".to_string();
    if let Some(latest) = &data.latest {
        if let Some(tag) = staleness_tag(now, latest.timestamp, 30.0) {
            title.push_str(&tag);
        }
    }

    let mut lines = Vec::new();
    match &data.latest {
        None => lines.push(Line::from(Span::styled(
            "  N/A - no server data",
            theme.style(Role::Dim),
        ))),
        Some(latest) => {
            let rows = [
                ("CPU: ", latest.cpu_percent, data.trends.cpu, data.averages.cpu, String::new()),
                (
                    "MEM: ",
                    latest.mem_percent(),
                    data.trends.mem,
                    data.averages.mem,
                    format!(
                        "{:.1}/{:.1}G",
                        latest.mem_used_mb / 1024.0,
                        latest.mem_total_mb / 1024.0
                    ),
                ),
                (
                    "DISK:",
                    latest.disk_percent(),
                    data.trends.disk,
                    data.averages.disk,
                    format!("{:.0}/{:.0}G", latest.disk_used_gb, latest.disk_total_gb),
                ),
            ];
            for (label, percent, trend, average, detail) in rows {
                let avg_text = average
                    .map(|a| format!("avg {:>3.0}%", a))
                    .unwrap_or_else(|| "avg  --".to_string());
                lines.push(Line::from(vec![
                    Span::styled(format!("  {} ", label), theme.style(Role::Dim)),
                    Span::styled(usage_bar(percent, 10), theme.style(usage_role(percent))),
                    Span::styled(
                        format!(" {:>4.0}% {} ", percent, trend.as_arrow()),
                        theme.style(usage_role(percent)),
                    ),
                    Span::styled(format!("{}  {}", avg_text, detail), theme.style(Role::Dim)),
                ]));
            }

            lines.push(Line::from(vec![
                Span::styled("  LOAD: ", theme.style(Role::Dim)),
                Span::styled(
                    format!(
                        "{:.2} {:.2} {:.2}",
                        latest.load[0], latest.load[1], latest.load[2]
                    ),
                    theme.style(Role::Normal),
                ),
                Span::styled("   CPU 1h ", theme.style(Role::Dim)),
                Span::styled(data.cpu_sparkline.clone(), theme.style(Role::Normal)),
            ]));
        }
    }

    let net_line = match &data.network {
        Some(net) => Line::from(vec![
            Span::styled("  NET:  ", theme.style(Role::Dim)),
            Span::styled(data.network_sparkline.clone(), theme.style(Role::Normal)),
            Span::styled(
                format!(
                    " {} conns / {} ips",
                    net.active_connections, net.unique_ips
                ),
                theme.style(Role::Normal),
            ),
            Span::styled(
                data.network_average
                    .map(|a| format!("  avg {:.0}", a))
                    .unwrap_or_default(),
                theme.style(Role::Dim),
            ),
        ]),
        None => Line::from(Span::styled("  NET:  N/A", theme.style(Role::Dim))),
    };
    lines.push(net_line);

    if let Some(processes) = &data.top_processes {
        lines.push(Line::from(Span::styled(
            "  Top processes",
            theme.style(Role::Dim),
        )));
        for process in processes.value.iter().take(3) {
            lines.push(Line::from(Span::styled(
                format!(
                    "   {:>6} {:<8} {:>5}% {}",
                    process.pid, process.user, process.cpu, process.command
                ),
                theme.style(Role::Normal),
            )));
        }
    }

    let paragraph = Paragraph::new(lines).block(panel_block(title, theme, focused));
    f.render_widget(paragraph, area);
}

pub fn render_cron(
    f: &mut Frame,
    area: Rect,
    data: &CronPanelData,
    now: f64,
    theme: &Theme,
    focused: bool,
) {
    let mut title = " CRON JOBS [3] ".to_string();
    if let Some(snapshot) = data.jobs.first() {
        if let Some(tag) = staleness_tag(now, snapshot.timestamp, 120.0) {
            title.push_str(&tag);
        }
    }

    let mut lines = Vec::new();
    if data.jobs.is_empty() {
        lines.push(Line::from(Span::styled(
            "  N/A - no cron data",
            theme.style(Role::Dim),
        )));
    } else {
        for snapshot in &data.jobs {
            let job = &snapshot.job;
            let (icon, role) = match job.status {
                CronStatus::Ok => ("●", Role::Normal),
                CronStatus::Error => ("✖", Role::Error),
                CronStatus::Running => ("▶", Role::Warning),
                CronStatus::Idle => ("·", Role::Dim),
            };
            let errors = if job.consecutive_errors > 0 {
                format!(" ({}x)", job.consecutive_errors)
            } else {
                String::new()
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ", icon), theme.style(role)),
                Span::styled(format!("{:<22}", job.name), theme.style(Role::Normal)),
                Span::styled(
                    format!("{:<8}{}", job.status.as_str(), errors),
                    theme.style(role),
                ),
                Span::styled(
                    format!("  next {}", job.next_run),
                    theme.style(Role::Dim),
                ),
            ]));
        }
    }

    let paragraph = Paragraph::new(lines).block(panel_block(title, theme, focused));
    f.render_widget(paragraph, area);
}

pub fn render_security(
    f: &mut Frame,
    area: Rect,
    data: &SecurityPanelData,
    now: f64,
    theme: &Theme,
    focused: bool,
) {
    let mut title = " SECURITY [4] ".to_string();
    if let Some((snapshot, _)) = &data.snapshot {
        if let Some(tag) = staleness_tag(now, snapshot.timestamp, 300.0) {
            title.push_str(&tag);
        }
    }

    let block = if data.nmap_active > 0 {
        panel_block(title, theme, focused).title_bottom(
            Line::from(Span::styled(" NMAP ACTIVE ", theme.style(Role::Nmap)))
                .alignment(Alignment::Right),
        )
    } else {
        panel_block(title, theme, focused)
    };

    let mut lines = Vec::new();
    match &data.snapshot {
        None => lines.push(Line::from(Span::styled(
            "  N/A - no security data",
            theme.style(Role::Dim),
        ))),
        Some((snapshot, ports)) => {
            let intrusion_role = if snapshot.ssh_intrusions_24h > 50 {
                Role::Error
            } else if snapshot.ssh_intrusions_24h > 0 {
                Role::Warning
            } else {
                Role::Normal
            };
            lines.push(Line::from(vec![
                Span::styled("  SSH intrusions 24h: ", theme.style(Role::Dim)),
                Span::styled(
                    snapshot.ssh_intrusions_24h.to_string(),
                    theme.style(intrusion_role),
                ),
            ]));

            let flag = |active: bool, good_when: bool| -> (&'static str, Role) {
                if active == good_when {
                    ("●", Role::Normal)
                } else {
                    ("✖", Role::Warning)
                }
            };
            let (ufw_icon, ufw_role) = flag(snapshot.ufw_active, true);
            let (f2b_icon, f2b_role) = flag(snapshot.fail2ban_active, true);
            let (root_icon, root_role) = flag(snapshot.root_login_enabled, false);
            lines.push(Line::from(vec![
                Span::styled(format!("  {} ufw  ", ufw_icon), theme.style(ufw_role)),
                Span::styled(format!("{} fail2ban  ", f2b_icon), theme.style(f2b_role)),
                Span::styled(format!("{} root-login", root_icon), theme.style(root_role)),
            ]));

            let port_list = ports
                .iter()
                .map(|p| format!("{}/{}", p.port, p.service))
                .collect::<Vec<_>>()
                .join(" ");
            lines.push(Line::from(vec![
                Span::styled(
                    format!("  Ports ({}): ", snapshot.ports_open),
                    theme.style(Role::Dim),
                ),
                Span::styled(port_list, theme.style(Role::Normal)),
            ]));
        }
    }

    if !data.attackers.is_empty() {
        lines.push(Line::from(Span::styled(
            "  Top failed logins",
            theme.style(Role::Dim),
        )));
        for attacker in &data.attackers {
            let ports = if attacker.open_ports.is_empty() {
                String::new()
            } else {
                format!(
                    "  open: {}",
                    attacker
                        .open_ports
                        .iter()
                        .map(|p| p.to_string())
                        .collect::<Vec<_>>()
                        .join(",")
                )
            };
            lines.push(Line::from(vec![
                Span::styled(
                    format!("   {:<16}", attacker.ip),
                    theme.style(Role::Error),
                ),
                Span::styled(
                    format!("[{}] {:>4}x", attacker.country_code, attacker.count),
                    theme.style(Role::Warning),
                ),
                Span::styled(ports, theme.style(Role::Dim)),
            ]));
        }
    }

    let paragraph = Paragraph::new(lines).block(block);
    f.render_widget(paragraph, area);
}

pub fn render_activity(
    f: &mut Frame,
    area: Rect,
    data: &ActivityPanelData,
    theme: &Theme,
    focused: bool,
) {
    let mut lines = Vec::new();

    if !data.errors.is_empty() {
        lines.push(Line::from(Span::styled(
            "  Errors",
            theme.style(Role::Error),
        )));
        for event in data.errors.iter().take(5) {
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<6}", event.time), theme.style(Role::Dim)),
                Span::styled(event.message.clone(), theme.style(Role::Error)),
            ]));
        }
        lines.push(Line::default());
    }

    lines.push(Line::from(Span::styled("  Recent", theme.style(Role::Dim))));
    if data.recent.is_empty() {
        lines.push(Line::from(Span::styled(
            "  N/A - no activity",
            theme.style(Role::Dim),
        )));
    } else {
        for event in data.recent.iter() {
            let role = match event.level {
                EventLevel::Error => Role::Error,
                EventLevel::Warning => Role::Warning,
                EventLevel::Info => Role::Normal,
            };
            lines.push(Line::from(vec![
                Span::styled(format!("  {:<6}", event.time), theme.style(Role::Dim)),
                Span::styled(format!("[{}] ", event.source), theme.style(Role::Dim)),
                Span::styled(event.message.clone(), theme.style(role)),
            ]));
        }
    }

    if !data.top_ips.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            "  Top peers",
            theme.style(Role::Dim),
        )));
        for peer in &data.top_ips {
            lines.push(Line::from(Span::styled(
                format!("   {:<16} {:>3}x  {}", peer.ip, peer.count, peer.hostname),
                theme.style(Role::Normal),
            )));
        }
    }

    let paragraph =
        Paragraph::new(lines).block(panel_block(" ACTIVITY LOG [5] ".to_string(), theme, focused));
    f.render_widget(paragraph, area);
}

pub fn render_sitrep(
    f: &mut Frame,
    area: Rect,
    data: &SitrepPanelData,
    theme: &Theme,
    focused: bool,
) {
    let mut lines = Vec::new();

    lines.push(Line::from(Span::styled(
        "  Channels",
        theme.style(Role::Dim),
    )));
    match &data.channels {
        Some(channels) if !channels.value.is_empty() => {
            for channel in &channels.value {
                let state = channel.state.to_uppercase();
                let (icon, role) = match state.as_str() {
                    "OK" => ("●", Role::Normal),
                    "WARN" => ("▲", Role::Warning),
                    _ => ("✖", Role::Error),
                };
                let mut spans = vec![
                    Span::styled(format!("  {} ", icon), theme.style(role)),
                    Span::styled(format!("{:<12}", channel.name), theme.style(role)),
                    Span::styled(format!(" {:<6}", state), theme.style(role)),
                ];
                if !channel.detail.is_empty() {
                    spans.push(Span::styled(
                        format!(" {}", channel.detail),
                        theme.style(Role::Dim),
                    ));
                }
                lines.push(Line::from(spans));
            }
            if let Some(age) = channels.stale_age {
                lines.push(Line::from(Span::styled(
                    format!("  ({} old)", format_age(age)),
                    theme.style(Role::Dim),
                )));
            }
        }
        _ => lines.push(Line::from(Span::styled(
            "  No channels configured",
            theme.style(Role::Dim),
        ))),
    }
    lines.push(Line::default());

    lines.push(Line::from(Span::styled(
        "  Update Status",
        theme.style(Role::Dim),
    )));
    match &data.update {
        Some(update) if update.value.available => {
            lines.push(Line::from(Span::styled(
                "  ▲ UPDATE AVAILABLE",
                theme.style(Role::Warning),
            )));
            lines.push(Line::from(Span::styled(
                format!(
                    "  Current: {}  Latest: {}",
                    update.value.current, update.value.latest
                ),
                theme.style(Role::Normal),
            )));
        }
        Some(_) => lines.push(Line::from(Span::styled(
            "  ● Up to date",
            theme.style(Role::Normal),
        ))),
        None => lines.push(Line::from(Span::styled(
            "  N/A",
            theme.style(Role::Dim),
        ))),
    }
    lines.push(Line::default());

    lines.push(Line::from(Span::styled(
        "  Action Items",
        theme.style(Role::Dim),
    )));
    match &data.action_items {
        Some(items) if !items.value.is_empty() => {
            for item in &items.value {
                let (icon, role) = match item.severity {
                    Severity::Error => ("✖", Role::Error),
                    Severity::Warn => ("▲", Role::Warning),
                    Severity::Info => ("●", Role::Normal),
                };
                lines.push(Line::from(vec![
                    Span::styled(format!("  {} ", icon), theme.style(role)),
                    Span::styled(item.text.clone(), theme.style(role)),
                ]));
            }
        }
        _ => lines.push(Line::from(Span::styled(
            "  ● ALL CLEAR",
            theme.style(Role::Normal),
        ))),
    }

    let paragraph =
        Paragraph::new(lines).block(panel_block(" SITREP [6] ".to_string(), theme, focused));
    f.render_widget(paragraph, area);
}

/// Help overlay listing the keybindings
pub fn render_help(f: &mut Frame, theme: &Theme) {
    let area = centered_rect(44, 14, f.area());
    f.render_widget(Clear, area);

    let bindings = [
        ("q", "Quit"),
        ("r", "Force refresh"),
        ("1-6", "Focus panel"),
        ("Tab", "Cycle focus"),
        ("t", "Cycle theme"),
        ("?", "This help"),
        ("Esc", "Close help"),
    ];
    let mut lines = vec![
        Line::from(Span::styled(
            "CIC Dashboard Help",
            theme.style(Role::Header),
        )),
        Line::default(),
    ];
    for (key, description) in bindings {
        lines.push(Line::from(vec![
            Span::styled(format!("  {:<6}", key), theme.style(Role::Highlight)),
            Span::styled(description, theme.style(Role::Normal)),
        ]));
    }

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.style(Role::Highlight))
            .title(Span::styled(" HELP ", theme.style(Role::Header))),
    );
    f.render_widget(paragraph, area);
}

/// Store-failure banner across the top of the screen
pub fn render_banner(f: &mut Frame, area: Rect, message: &str, theme: &Theme) {
    let paragraph = Paragraph::new(Line::from(Span::styled(
        format!(" STORE UNAVAILABLE: {} ", message),
        theme.style(Role::Error),
    )))
    .alignment(Alignment::Center);
    f.render_widget(paragraph, area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    Rect {
        x,
        y,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

/// Panel areas for the current terminal width: three breakpoints
pub fn panel_areas(area: Rect) -> Vec<Rect> {
    if area.width >= 120 {
        // Wide: two rows of three columns.
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        let thirds = [
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ];
        let top = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(thirds)
            .split(rows[0]);
        let bottom = Layout::default()
            .direction(Direction::Horizontal)
            .constraints(thirds)
            .split(rows[1]);
        vec![top[0], top[1], top[2], bottom[0], bottom[1], bottom[2]]
    } else if area.width >= 60 {
        // Medium: three rows of two columns.
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(33),
                Constraint::Percentage(34),
                Constraint::Percentage(33),
            ])
            .split(area);
        let mut areas = Vec::with_capacity(6);
        for row in rows.iter() {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(*row);
            areas.push(cols[0]);
            areas.push(cols[1]);
        }
        areas
    } else {
        // Narrow: single column, all six stacked.
        Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Ratio(1, 6); 6])
            .split(area)
            .to_vec()
    }
}

/// Draw the whole dashboard
pub fn render_dashboard(
    f: &mut Frame,
    data: &DashboardData,
    banner: Option<&str>,
    theme: &Theme,
    focus: usize,
    show_help: bool,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(10)])
        .split(f.area());

    match banner {
        Some(message) => render_banner(f, chunks[0], message, theme),
        None => {
            let header = Paragraph::new(Line::from(vec![
                Span::styled(
                    "  CIC — Combat Information Center  ",
                    theme.style(Role::Header),
                ),
                Span::styled(
                    chrono::Utc::now().format("[%H:%M UTC]").to_string(),
                    theme.style(Role::Footer),
                ),
            ]));
            f.render_widget(header, chunks[0]);
        }
    }

    let areas = panel_areas(chunks[1]);
    render_agents(f, areas[0], &data.agents, data.now, theme, focus == 0);
    render_server(f, areas[1], &data.server, data.now, theme, focus == 1);
    render_cron(f, areas[2], &data.cron, data.now, theme, focus == 2);
    render_security(f, areas[3], &data.security, data.now, theme, focus == 3);
    render_activity(f, areas[4], &data.activity, theme, focus == 4);
    render_sitrep(f, areas[5], &data.sitrep, theme, focus == 5);

    if show_help {
        render_help(f, theme);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_bar() {
        assert_eq!(usage_bar(0.0, 10), "░░░░░░░░░░");
        assert_eq!(usage_bar(50.0, 10), "█████░░░░░");
        assert_eq!(usage_bar(100.0, 10), "██████████");
        assert_eq!(usage_bar(150.0, 10), "██████████");
    }

    #[test]
    fn test_usage_role_thresholds() {
        assert_eq!(usage_role(50.0), Role::Normal);
        assert_eq!(usage_role(70.0), Role::Warning);
        assert_eq!(usage_role(89.9), Role::Warning);
        // 7.4Gi of 8.0Gi is 92.5%: rendered with the error role.
        assert_eq!(usage_role(92.5), Role::Error);
    }

    #[test]
    fn test_format_tokens() {
        assert_eq!(format_tokens(359_000), "359k");
        assert_eq!(format_tokens(950), "950");
        assert_eq!(format_tokens(0), "0");
    }

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(45.0), "45s");
        assert_eq!(format_age(120.0), "2m");
        assert_eq!(format_age(7200.0), "2h");
    }

    #[test]
    fn test_panel_areas_breakpoints() {
        let wide = panel_areas(Rect::new(0, 0, 160, 48));
        assert_eq!(wide.len(), 6);
        // Two rows of three: first three share a y coordinate.
        assert_eq!(wide[0].y, wide[1].y);
        assert_eq!(wide[1].y, wide[2].y);
        assert!(wide[3].y > wide[0].y);

        let medium = panel_areas(Rect::new(0, 0, 100, 48));
        assert_eq!(medium.len(), 6);
        // Two columns: pairs share a y coordinate.
        assert_eq!(medium[0].y, medium[1].y);
        assert!(medium[2].y > medium[0].y);

        let narrow = panel_areas(Rect::new(0, 0, 50, 60));
        assert_eq!(narrow.len(), 6);
        // Single column: all share x, strictly stacked.
        assert!(narrow.windows(2).all(|w| w[0].x == w[1].x && w[1].y > w[0].y));
    }

    #[test]
    fn test_staleness_tag() {
        assert_eq!(staleness_tag(1000.0, 990.0, 30.0), None);
        assert_eq!(
            staleness_tag(1000.0, 800.0, 30.0),
            Some(" (3m old)".to_string())
        );
    }
}
