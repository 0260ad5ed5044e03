use crate::application::{App, AppMode, FormItem};
use crate::domain::{
    ApplicantType, DocumentSlot, PaymentStatus, RegistrationState, Step, field_hints,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

pub fn render_ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(0),
            Constraint::Length(4),
        ])
        .split(f.area());

    render_header(f, app, chunks[0]);
    render_step(f, app, chunks[1]);
    render_status_bar(f, app, chunks[2]);

    if app.mode == AppMode::Help {
        render_help_popup(f, app.help_scroll);
    }
}

fn render_header(f: &mut Frame, app: &App, area: Rect) {
    let state = app.wizard.state();
    let current = state.current_step;

    let title = Line::from(Span::styled(
        format!(
            "bnreg - Business Name Registration | Step {}/7: {}",
            current.number(),
            current.title()
        ),
        Style::default().fg(Color::Cyan),
    ));

    let mut progress = Vec::new();
    for step in Step::ALL {
        let (marker, style) = if step == current {
            ("●", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        } else if state.completed_steps.contains(&step) {
            ("✓", Style::default().fg(Color::Green))
        } else {
            ("○", Style::default().fg(Color::DarkGray))
        };
        progress.push(Span::styled(format!("{marker} {}  ", step.title()), style));
    }

    f.render_widget(Paragraph::new(vec![title, Line::from(progress)]), area);
}

fn render_step(f: &mut Frame, app: &App, area: Rect) {
    let items = app.form_items();
    if items.is_empty() {
        render_details(f, app, area);
        return;
    }

    let form_height = (items.len() as u16 + 2).min(area.height.saturating_sub(3).max(3));
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(form_height), Constraint::Min(0)])
        .split(area);

    render_form(f, app, &items, chunks[0]);
    render_details(f, app, chunks[1]);
}

fn render_form(f: &mut Frame, app: &App, items: &[FormItem], area: Rect) {
    let visible = area.height.saturating_sub(2) as usize;
    let offset = app.focus.saturating_sub(visible.saturating_sub(1));

    let rows: Vec<Row> = items
        .iter()
        .enumerate()
        .skip(offset)
        .take(visible)
        .map(|(index, item)| {
            let focused = index == app.focus;
            let (label, value) = if focused && app.mode == AppMode::Editing {
                (item_label(app, *item), with_cursor(&app.input, app.cursor_position))
            } else {
                (item_label(app, *item), item_value(app, *item))
            };
            let style = if focused {
                Style::default().bg(Color::Blue).fg(Color::White)
            } else {
                Style::default()
            };
            Row::new(vec![
                Cell::from(label).style(Style::default().fg(Color::Yellow)),
                Cell::from(value),
            ])
            .style(style)
        })
        .collect();

    let table = Table::new(rows, [Constraint::Length(32), Constraint::Min(10)])
        .block(Block::default().borders(Borders::ALL).title(app.step().title()));
    f.render_widget(table, area);
}

fn with_cursor(input: &str, cursor: usize) -> String {
    let mut shown = String::with_capacity(input.len() + 3);
    for (index, c) in input.chars().enumerate() {
        if index == cursor {
            shown.push('│');
        }
        shown.push(c);
    }
    if cursor >= input.chars().count() {
        shown.push('│');
    }
    shown
}

fn item_label(app: &App, item: FormItem) -> String {
    match item {
        FormItem::PreferredName(index) => format!("Preferred name {}", index + 1),
        FormItem::CheckNames => "Check availability".to_string(),
        FormItem::NameResult(index) => app
            .wizard
            .name_results()
            .get(index)
            .map(|outcome| outcome.name.clone())
            .unwrap_or_default(),
        FormItem::ApplicantType => "Applicant type".to_string(),
        FormItem::Gender => "Gender".to_string(),
        FormItem::Text(field) => field.label().to_string(),
        FormItem::SameAsResidential => "Same as residential address".to_string(),
        FormItem::Document(slot) => slot.label().to_string(),
        FormItem::Terms => "Terms and conditions".to_string(),
    }
}

fn item_value(app: &App, item: FormItem) -> String {
    let state = app.wizard.state();
    match item {
        FormItem::PreferredName(index) => {
            state.preferred_names.get(index).cloned().unwrap_or_default()
        }
        FormItem::CheckNames => "[ Enter to check ]".to_string(),
        FormItem::NameResult(index) => match app.wizard.name_results().get(index) {
            Some(outcome) if outcome.available => {
                let selected = state.selected_business_name == outcome.name;
                format!("{} available", if selected { "(•)" } else { "( )" })
            }
            Some(_) => "    not available".to_string(),
            None => String::new(),
        },
        FormItem::ApplicantType => format!("< {} >", state.applicant_type.label()),
        FormItem::Gender => match state.gender.as_str() {
            "" => "< select >".to_string(),
            gender => format!("< {gender} >"),
        },
        FormItem::Text(field) => state.text(field).to_string(),
        FormItem::SameAsResidential => checkbox(state.same_as_residential),
        FormItem::Document(slot) => match state.document(slot) {
            Some(document) => format!("✓ uploaded ({})", document.mime()),
            None => "not uploaded (Enter a file path)".to_string(),
        },
        FormItem::Terms => format!("{} I agree", checkbox(app.wizard.terms_accepted())),
    }
}

fn checkbox(checked: bool) -> String {
    if checked { "[x]" } else { "[ ]" }.to_string()
}

fn render_details(f: &mut Frame, app: &App, area: Rect) {
    let state = app.wizard.state();
    let lines = match state.current_step {
        Step::NameCheck => name_check_details(app),
        Step::ApplicantInfo | Step::BusinessDetails => hint_lines(state),
        Step::Documents => document_details(app),
        Step::Review => review_details(app),
        Step::Payment => payment_details(app),
        Step::Confirmation => confirmation_details(app),
    };

    let details = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Details"))
        .wrap(Wrap { trim: false });
    f.render_widget(details, area);
}

fn error_line(message: &str) -> Line<'static> {
    Line::from(Span::styled(
        message.to_string(),
        Style::default().fg(Color::Red),
    ))
}

fn heading(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        text.to_string(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
}

fn pair(label: &str, value: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), Style::default().fg(Color::Yellow)),
        Span::raw(if value.trim().is_empty() { "-".to_string() } else { value.to_string() }),
    ])
}

fn name_check_details(app: &App) -> Vec<Line<'static>> {
    let state = app.wizard.state();
    let mut lines = Vec::new();
    if let Some(error) = &app.wizard.errors().name_check {
        lines.push(error_line(error));
    }
    for outcome in app.wizard.name_results() {
        let style = if outcome.available {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Red)
        };
        lines.push(Line::from(Span::styled(outcome.name.clone(), style)));
        if !outcome.message.is_empty() {
            lines.push(Line::from(format!("  {}", outcome.message)));
        }
        if !outcome.recommendations.is_empty() {
            lines.push(Line::from(format!(
                "  Suggestions: {}",
                outcome.recommendations.join(", ")
            )));
        }
    }
    if !state.selected_business_name.is_empty() {
        lines.push(Line::from(""));
        lines.push(Line::from(format!(
            "You've selected \"{}\". Press Ctrl+N to continue with applicant information.",
            state.selected_business_name
        )));
    }
    lines.extend(hint_lines(state));
    lines
}

fn hint_lines(state: &RegistrationState) -> Vec<Line<'static>> {
    let today = chrono::Local::now().date_naive();
    field_hints(state, today)
        .into_iter()
        .map(|(label, hint)| {
            Line::from(Span::styled(
                format!("{label}: {hint}"),
                Style::default().fg(Color::LightYellow),
            ))
        })
        .collect()
}

fn document_details(app: &App) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for slot in DocumentSlot::ALL {
        let accepted = if slot.accepted_types().contains(&"application/pdf") {
            "PDF, JPG, PNG"
        } else {
            "JPG, PNG"
        };
        lines.push(Line::from(format!(
            "{}: {accepted}, max {}MB",
            slot.label(),
            slot.max_size() / (1024 * 1024)
        )));
        if let Some(error) = &app.wizard.errors().documents[slot.index()] {
            lines.push(error_line(&format!("  {error}")));
        }
    }
    lines.push(Line::from(""));
    lines.push(Line::from("Enter: type a file path | Delete: remove the uploaded file"));
    lines
}

fn review_details(app: &App) -> Vec<Line<'static>> {
    let state = app.wizard.state();
    let mut lines = vec![
        heading("Business"),
        pair("Name", &state.selected_business_name),
        pair("Activity", &state.business_activity),
        pair("Commencement", &state.commencement_date),
        pair(
            "Address",
            if state.same_as_residential {
                &state.residential_address
            } else {
                &state.business_address
            },
        ),
        heading("Applicant"),
        pair("Type", state.applicant_type.label()),
        pair("Name", &state.applicant_display_name()),
    ];
    if state.applicant_type == ApplicantType::Organization {
        lines.push(pair("RC number", &state.rc_number));
    }
    lines.push(pair("Email", state.contact_email()));
    lines.push(pair("Phone", &state.phone));

    lines.push(heading("Documents"));
    for slot in DocumentSlot::ALL {
        let status = if state.document(slot).is_some() { "✓" } else { "missing" };
        lines.push(pair(slot.label(), status));
    }

    lines.push(heading("Fee"));
    let payment = &app.wizard.settings().payment;
    lines.push(pair(
        "Registration fee",
        &format!("{} {}", payment.currency, format_amount(payment.amount)),
    ));

    for issue in &app.wizard.errors().review {
        lines.push(error_line(issue));
    }
    if let Some(error) = &app.wizard.errors().payment {
        lines.push(error_line(error));
    }
    lines
}

fn format_amount(minor: u64) -> String {
    format!("{}.{:02}", minor / 100, minor % 100)
}

fn payment_details(app: &App) -> Vec<Line<'static>> {
    let state = app.wizard.state();
    let mut lines = vec![
        pair("Payment reference", &state.payment_reference),
        pair("Status", state.payment_status.as_str()),
    ];
    if let Some(url) = app.wizard.authorization_url() {
        lines.push(pair("Pay at", url));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(match state.payment_status {
        PaymentStatus::Initiating => {
            "Waiting for the payment to be confirmed. This screen updates automatically."
        }
        PaymentStatus::Success if state.submitted => "Payment confirmed and application submitted.",
        PaymentStatus::Success => "Payment confirmed. Press Ctrl+N to complete registration.",
        PaymentStatus::Failed => "Payment was not completed. Press Ctrl+P to go back and retry.",
        PaymentStatus::Pending => "No payment has been started yet.",
    }));
    if let Some(error) = &app.wizard.errors().payment {
        lines.push(error_line(error));
    }
    if let Some(error) = &app.wizard.errors().submission {
        lines.push(error_line(&format!("Submission failed: {error}")));
    }
    lines
}

fn confirmation_details(app: &App) -> Vec<Line<'static>> {
    let state = app.wizard.state();
    if !state.submitted {
        return vec![Line::from(
            "Registration has not been submitted yet. Press Ctrl+N to start over.",
        )];
    }
    vec![
        heading("Registration submitted"),
        pair("Application reference", &state.application_reference),
        pair("Business name", &state.selected_business_name),
        pair("Applicant", &state.applicant_display_name()),
        pair("Email", state.contact_email()),
        Line::from(""),
        Line::from("Use `bnreg status <reference>` to follow the application."),
    ]
}

fn render_status_bar(f: &mut Frame, app: &App, area: Rect) {
    let enabled = Style::default().fg(Color::Green);
    let disabled = Style::default().fg(Color::DarkGray);

    let next_label = if app.wizard.is_busy() {
        "Processing..."
    } else {
        app.wizard.next_label()
    };
    let navigation = Line::from(vec![
        Span::styled(
            "Ctrl+P: ◀ Previous",
            if app.wizard.can_go_previous() { enabled } else { disabled },
        ),
        Span::raw(" | "),
        Span::styled(
            format!("Ctrl+N: {next_label} ▶"),
            if app.wizard.can_go_next() { enabled } else { disabled },
        ),
        Span::raw(" | ↑↓: select | Enter: edit/choose | F1: help | Esc: quit"),
    ]);

    let message = match app.mode {
        AppMode::Editing => "Editing (Enter to save, Esc to cancel)".to_string(),
        AppMode::Help => "↑↓: scroll | PgUp/PgDn: fast scroll | Home: top | Esc: close help".to_string(),
        AppMode::Normal => app.wizard.status_message().unwrap_or_default().to_string(),
    };

    let status = Paragraph::new(vec![navigation, Line::from(message)])
        .block(Block::default().borders(Borders::ALL).title("Status"))
        .style(match app.mode {
            AppMode::Normal => Style::default(),
            AppMode::Editing => Style::default().fg(Color::Green),
            AppMode::Help => Style::default().fg(Color::Cyan),
        });
    f.render_widget(status, area);
}

fn render_help_popup(f: &mut Frame, scroll: usize) {
    let area = f.area();
    let popup_area = Rect {
        x: area.width / 10,
        y: area.height / 10,
        width: area.width * 4 / 5,
        height: area.height * 4 / 5,
    };

    f.render_widget(Clear, popup_area);

    let help_lines: Vec<&str> = HELP_TEXT.lines().collect();
    let visible_height = popup_area.height.saturating_sub(2) as usize;

    let start_line = scroll.min(help_lines.len().saturating_sub(visible_height));
    let end_line = (start_line + visible_height).min(help_lines.len());

    let help_widget = Paragraph::new(help_lines[start_line..end_line].join("\n"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("Help (Line {}/{})", start_line + 1, help_lines.len()))
                .style(Style::default().fg(Color::Cyan)),
        )
        .style(Style::default().fg(Color::White));

    f.render_widget(help_widget, popup_area);
}

pub fn help_line_count() -> usize {
    HELP_TEXT.lines().count()
}

const HELP_TEXT: &str = r#"BUSINESS NAME REGISTRATION

=== STEPS ===
1 Business Name     Enter up to two preferred names and check availability
2 Applicant Info    Individual proprietor or organization details
3 Business Details  Activity, address, contacts and commencement date
4 Documents         Supporting document, signature, means of ID, passport
5 Review            Confirm the summary and accept the terms
6 Payment           Pay the registration fee; the link is copied to the clipboard
7 Confirmation      Your application reference

=== NAVIGATION ===
Ctrl+N          Next (Proceed to Payment / Complete Registration / Back to Home)
Ctrl+P          Previous step
↑↓ / Tab        Move between fields
Enter           Edit a field, check names, choose a name, toggle an option
Space           Toggle the focused option
Delete          Remove the focused document
F1              Show this help
Esc / Ctrl+C    Quit (progress is saved automatically)

=== EDITING ===
Type            Insert text at the cursor
←→ Home End     Move the cursor
Backspace       Delete before the cursor
Enter / Tab     Save the field
Esc             Discard the edit

=== DOCUMENTS ===
Enter the path of a file on disk.
Supporting document and means of ID: PDF, JPG or PNG up to 5MB.
Signature and passport photograph: JPG or PNG up to 2MB.

=== PAYMENT ===
After "Proceed to Payment" open the copied link in a browser.
The payment status is checked every few seconds; once it succeeds the
registration is submitted automatically. If submission fails, press
Ctrl+N on the payment step to try again.

=== HELP NAVIGATION ===
↑↓              Scroll help text up/down one line
Page Up/Down    Scroll help text up/down 5 lines
Home            Jump to top of help text
Esc/F1/q        Close this help window"#;
