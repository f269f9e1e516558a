use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use docfields_config::Config;
use docfields_engine::import::{IMPORT_EXTENSION, register_import_button};
use docfields_engine::{
    BasicDocxConverter, DEFAULT_INITIAL_CONTENT, EditorSurface, EventSet, FieldId, FieldType,
    FieldsPanel, IMPORT_ACTION, ImportError, ImportOutcome, ImportTracker, MemorySurface,
    PanelSettings,
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};
use std::{
    env, fs,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
};

/// Input focus inside the add/edit form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Name,
    Type,
    Category,
    Placeholder,
}

impl FormField {
    /// Next input; the edit form has no category input
    fn cycle(self, adding: bool) -> Self {
        match self {
            FormField::Name => FormField::Type,
            FormField::Type if adding => FormField::Category,
            FormField::Type => FormField::Placeholder,
            FormField::Category => FormField::Placeholder,
            FormField::Placeholder => FormField::Name,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Prompt {
    TypeText,
    ImportPath,
    WritePath,
}

impl Prompt {
    fn title(self) -> &'static str {
        match self {
            Prompt::TypeText => "Type into document",
            Prompt::ImportPath => "Import Content From Word Document",
            Prompt::WritePath => "Write document to",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    Browse,
    Adding(FormField),
    Editing(FormField),
    Prompt { kind: Prompt, input: String },
    /// Blocking message; any key dismisses it
    Error(String),
}

/// One line of the sidebar list
#[derive(Debug, Clone, PartialEq, Eq)]
enum SidebarRow {
    Category(String),
    Field(FieldId),
}

struct App {
    panel: FieldsPanel<MemorySurface>,
    imports: ImportTracker,
    converter: BasicDocxConverter,
    runtime: tokio::runtime::Runtime,
    import_dir: Option<PathBuf>,
    rows: Vec<SidebarRow>,
    list_state: ListState,
    mode: Mode,
    status: String,
}

impl App {
    fn new(config: &Config) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let mut panel = FieldsPanel::new(PanelSettings {
            default_category: config.default_category.clone(),
            expanded_categories: config.expanded_categories.clone(),
            sync_events: EventSet::parse(&config.sync_events)?,
        });
        let content = config
            .initial_content
            .as_deref()
            .unwrap_or(DEFAULT_INITIAL_CONTENT);
        let mut surface = MemorySurface::new(content);
        register_import_button(&mut surface);
        panel.attach(surface);

        let mut app = Self {
            panel,
            imports: ImportTracker::new(),
            converter: BasicDocxConverter::new(),
            runtime,
            import_dir: config.import_dir.clone(),
            rows: Vec::new(),
            list_state: ListState::default(),
            mode: Mode::Browse,
            status: String::new(),
        };
        app.refresh_rows();
        Ok(app)
    }

    /// Replace the document with a file: DOCX through the importer, anything else as text
    fn open(&mut self, path: &Path) -> Result<()> {
        let is_docx = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(IMPORT_EXTENSION));

        if is_docx {
            let outcome = self.import(path)?;
            self.report_import(path, &outcome);
        } else {
            let content = fs::read_to_string(path)?;
            if let Some(editor) = self.panel.editor_mut() {
                editor.set_content(&content);
            }
            self.status = format!("Opened {}", path.display());
        }

        self.after_input();
        Ok(())
    }

    fn import(&mut self, path: &Path) -> Result<ImportOutcome, ImportError> {
        let Self {
            runtime,
            imports,
            converter,
            panel,
            ..
        } = self;
        runtime.block_on(imports.import_file(path, &*converter, panel.editor_mut()))
    }

    fn report_import(&mut self, path: &Path, outcome: &ImportOutcome) {
        self.status = match outcome {
            ImportOutcome::Applied { warnings } if warnings.is_empty() => {
                format!("Imported {}", path.display())
            }
            ImportOutcome::Applied { warnings } => format!(
                "Imported {} ({} conversion messages, see log)",
                path.display(),
                warnings.len()
            ),
            ImportOutcome::Superseded => "Import superseded by a newer one".to_string(),
            ImportOutcome::NoEditor => "No document to import into".to_string(),
        };
    }

    fn content(&self) -> String {
        self.panel
            .editor()
            .map(|editor| editor.content())
            .unwrap_or_default()
    }

    /// Route editor notifications, then rebuild the sidebar rows
    fn after_input(&mut self) {
        for action in self.panel.pump() {
            if action == IMPORT_ACTION {
                self.open_prompt(Prompt::ImportPath);
            }
        }
        self.refresh_rows();
    }

    fn refresh_rows(&mut self) {
        let view = self.panel.view();
        self.rows = view
            .categories
            .into_iter()
            .flat_map(|category| {
                let fields: Vec<SidebarRow> = if category.expanded {
                    category
                        .rows
                        .iter()
                        .map(|row| SidebarRow::Field(row.id))
                        .collect()
                } else {
                    Vec::new()
                };
                std::iter::once(SidebarRow::Category(category.category)).chain(fields)
            })
            .collect();

        let selected = if self.rows.is_empty() {
            None
        } else {
            Some(
                self.list_state
                    .selected()
                    .unwrap_or(0)
                    .min(self.rows.len() - 1),
            )
        };
        self.list_state.select(selected);
    }

    fn selected_row(&self) -> Option<SidebarRow> {
        self.list_state
            .selected()
            .and_then(|index| self.rows.get(index))
            .cloned()
    }

    fn next_row(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => (i + 1) % self.rows.len(),
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    fn previous_row(&mut self) {
        if self.rows.is_empty() {
            return;
        }
        let i = match self.list_state.selected() {
            Some(0) | None => self.rows.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn open_prompt(&mut self, kind: Prompt) {
        let input = match (kind, &self.import_dir) {
            (Prompt::ImportPath, Some(dir)) => format!("{}/", dir.display()),
            _ => String::new(),
        };
        self.mode = Mode::Prompt { kind, input };
    }

    /// Handle one key press; returns true when the app should quit
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        let mode = std::mem::replace(&mut self.mode, Mode::Browse);
        let quit = match mode {
            Mode::Browse => self.browse_key(key),
            Mode::Adding(focus) => {
                self.form_key(focus, true, key);
                false
            }
            Mode::Editing(focus) => {
                self.form_key(focus, false, key);
                false
            }
            Mode::Prompt { kind, input } => {
                self.prompt_key(kind, input, key);
                false
            }
            Mode::Error(_) => false,
        };
        self.after_input();
        quit
    }

    fn browse_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Down | KeyCode::Char('j') => self.next_row(),
            KeyCode::Up | KeyCode::Char('k') => self.previous_row(),
            KeyCode::Enter => {
                if let Some(SidebarRow::Field(id)) = self.selected_row() {
                    self.panel.insert_field(id);
                }
            }
            KeyCode::Char(' ') => match self.selected_row() {
                Some(SidebarRow::Category(category)) => self.panel.toggle_category(&category),
                Some(SidebarRow::Field(id)) => {
                    if let Some(category) = self.panel.registry().get(id).map(|f| f.category.clone())
                    {
                        self.panel.toggle_category(&category);
                    }
                }
                None => {}
            },
            KeyCode::Char('a') => {
                self.panel.begin_add();
                self.mode = Mode::Adding(FormField::Name);
            }
            KeyCode::Char('e') => {
                if let Some(SidebarRow::Field(id)) = self.selected_row()
                    && self.panel.begin_edit(id)
                {
                    self.mode = Mode::Editing(FormField::Name);
                }
            }
            KeyCode::Char('d') => {
                if let Some(SidebarRow::Field(id)) = self.selected_row()
                    && let Some(field) = self.panel.delete_field(id)
                {
                    self.status = format!("Deleted {}", field.name);
                }
            }
            KeyCode::Char('t') => self.open_prompt(Prompt::TypeText),
            KeyCode::Char('i') => {
                if let Some(editor) = self.panel.editor_mut() {
                    editor.click_button(IMPORT_ACTION);
                }
            }
            KeyCode::Char('w') => self.open_prompt(Prompt::WritePath),
            _ => {}
        }
        false
    }

    fn form_key(&mut self, focus: FormField, adding: bool, key: KeyEvent) {
        let stay = |focus| {
            if adding {
                Mode::Adding(focus)
            } else {
                Mode::Editing(focus)
            }
        };

        match key.code {
            KeyCode::Esc if adding => self.panel.cancel_add(),
            KeyCode::Esc => self.panel.cancel_edit(),
            KeyCode::Enter if adding => match self.panel.commit_add() {
                Some(_) => self.status = "Field added".to_string(),
                None => {
                    self.status = "Name and category are required".to_string();
                    self.mode = stay(focus);
                }
            },
            KeyCode::Enter => {
                self.panel.save_edit();
            }
            KeyCode::Tab => self.mode = stay(focus.cycle(adding)),
            KeyCode::Left if focus == FormField::Type => {
                self.cycle_type(adding, FieldType::prev);
                self.mode = stay(focus);
            }
            KeyCode::Right if focus == FormField::Type => {
                self.cycle_type(adding, FieldType::next);
                self.mode = stay(focus);
            }
            KeyCode::Char(c) => {
                if let Some(text) = self.form_text(focus, adding) {
                    text.push(c);
                }
                self.mode = stay(focus);
            }
            KeyCode::Backspace => {
                if let Some(text) = self.form_text(focus, adding) {
                    text.pop();
                }
                self.mode = stay(focus);
            }
            _ => self.mode = stay(focus),
        }
    }

    fn form_text(&mut self, focus: FormField, adding: bool) -> Option<&mut String> {
        if adding {
            let draft = self.panel.draft_mut()?;
            match focus {
                FormField::Name => Some(&mut draft.name),
                FormField::Category => Some(&mut draft.category),
                FormField::Placeholder => Some(&mut draft.placeholder),
                FormField::Type => None,
            }
        } else {
            let field = self.panel.editing_field_mut()?;
            match focus {
                FormField::Name => Some(&mut field.name),
                FormField::Placeholder => Some(field.placeholder.get_or_insert_with(String::new)),
                FormField::Type | FormField::Category => None,
            }
        }
    }

    fn cycle_type(&mut self, adding: bool, step: fn(FieldType) -> FieldType) {
        if adding {
            if let Some(draft) = self.panel.draft_mut() {
                draft.field_type = step(draft.field_type);
            }
        } else if let Some(current) = self.panel.editing_field_mut().map(|f| f.field_type) {
            self.panel.edit_type(step(current));
        }
    }

    fn prompt_key(&mut self, kind: Prompt, mut input: String, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {}
            KeyCode::Enter => self.submit_prompt(kind, &input),
            KeyCode::Backspace => {
                input.pop();
                self.mode = Mode::Prompt { kind, input };
            }
            KeyCode::Char(c) => {
                input.push(c);
                self.mode = Mode::Prompt { kind, input };
            }
            _ => self.mode = Mode::Prompt { kind, input },
        }
    }

    fn submit_prompt(&mut self, kind: Prompt, input: &str) {
        match kind {
            Prompt::TypeText => {
                if let Some(editor) = self.panel.editor_mut() {
                    editor.type_text(input);
                }
            }
            Prompt::ImportPath => {
                let path = PathBuf::from(input.trim());
                if input.trim().is_empty() {
                    return;
                }
                match self.import(&path) {
                    Ok(outcome) => self.report_import(&path, &outcome),
                    Err(e) => self.mode = Mode::Error(format!("Error importing DOCX: {e}")),
                }
            }
            Prompt::WritePath => {
                let path = PathBuf::from(input.trim());
                if input.trim().is_empty() {
                    return;
                }
                match fs::write(&path, self.content()) {
                    Ok(()) => self.status = format!("Wrote {}", path.display()),
                    Err(e) => {
                        log::error!("Failed to write {}: {e}", path.display());
                        self.mode = Mode::Error(format!("Failed to write {}: {e}", path.display()));
                    }
                }
            }
        }
    }

    fn sidebar_items(&self) -> Vec<ListItem<'static>> {
        let view = self.panel.view();
        self.rows
            .iter()
            .map(|row| {
                let text = match row {
                    SidebarRow::Category(name) => {
                        let category = view.categories.iter().find(|c| &c.category == name);
                        let (marker, count) = match category {
                            Some(c) => (if c.expanded { "▾" } else { "▸" }, c.count),
                            None => ("▸", 0),
                        };
                        format!("{marker} {name} ({count})")
                    }
                    SidebarRow::Field(id) => match self.panel.registry().get(*id) {
                        Some(field) => {
                            let editing = if self.panel.is_editing(*id) { "✎ " } else { "" };
                            format!("    {editing}{} [{}]", field.name, field.field_type.label())
                        }
                        None => String::new(),
                    },
                };
                ListItem::new(Line::from(text))
            })
            .collect()
    }

    fn form_lines(&self, focus: FormField, adding: bool) -> Vec<Line<'static>> {
        let entries: Vec<(FormField, &str, String)> = if adding {
            let Some(draft) = self.panel.draft() else {
                return Vec::new();
            };
            vec![
                (FormField::Name, "Name", draft.name.clone()),
                (FormField::Type, "Type", draft.field_type.label().to_string()),
                (FormField::Category, "Category", draft.category.clone()),
                (FormField::Placeholder, "Placeholder", draft.placeholder.clone()),
            ]
        } else {
            let Some(field) = self.panel.editing().and_then(|id| self.panel.registry().get(id))
            else {
                return Vec::new();
            };
            vec![
                (FormField::Name, "Name", field.name.clone()),
                (FormField::Type, "Type", field.field_type.label().to_string()),
                (
                    FormField::Placeholder,
                    "Placeholder",
                    field.placeholder.clone().unwrap_or_default(),
                ),
            ]
        };

        entries
            .into_iter()
            .map(|(field, label, value)| {
                let (marker, style) = if field == focus {
                    ("> ", Style::default().fg(Color::Yellow))
                } else {
                    ("  ", Style::default())
                };
                Line::from(vec![
                    Span::raw(format!("{marker}{label}: ")),
                    Span::styled(value, style),
                ])
            })
            .collect()
    }
}

/// Logger writing to `target`; `RUST_LOG` overrides the default `info` level
fn logger(target: env_logger::Target) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(target);
    builder
}

/// Log to a file so records never land on the alternate screen
fn init_logging() -> Result<PathBuf> {
    let log_path = Config::log_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(&log_path)?;
    logger(env_logger::Target::Pipe(Box::new(file))).init();
    Ok(log_path)
}

fn main() -> Result<()> {
    match init_logging() {
        Ok(log_path) => log::info!("docfields starting up, logging to {}", log_path.display()),
        Err(e) => eprintln!("Warning: logging disabled: {e}"),
    }

    let args: Vec<String> = env::args().collect();
    if args.len() > 2 {
        eprintln!("Usage: {} [document]", args[0]);
        process::exit(1);
    }

    let config = match Config::load_or_default() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    log::info!("Config path: {}", Config::config_path().display());

    let mut app = App::new(&config)?;

    if let Some(document) = args.get(1) {
        let path = PathBuf::from(document);
        if let Err(e) = app.open(&path) {
            eprintln!("Error: Could not open '{}': {e}", path.display());
            process::exit(1);
        }
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && app.handle_key(key)
        {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let outer = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .margin(1)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)].as_ref())
        .split(outer[0]);

    // Fields panel
    let fields_block = Block::default()
        .borders(Borders::ALL)
        .title("Dynamic Fields");
    if app.panel.view().is_empty {
        let hint = Paragraph::new(vec![
            Line::from("No fields yet."),
            Line::from("Type {{name}} in the document or press a to add one."),
        ])
        .block(fields_block)
        .wrap(Wrap { trim: true });
        f.render_widget(hint, chunks[0]);
    } else {
        let fields_list = List::new(app.sidebar_items())
            .block(fields_block)
            .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
        f.render_stateful_widget(fields_list, chunks[0], &mut app.list_state);
    }

    // Document panel
    let document = Paragraph::new(app.content())
        .block(Block::default().borders(Borders::ALL).title("Document"))
        .wrap(Wrap { trim: false });
    f.render_widget(document, chunks[1]);

    // Status and instructions
    let help_text = Line::from(vec![
        Span::raw("q: Quit | ↑/↓: Select | Enter: Insert | Space: Toggle | "),
        Span::raw("a: Add | e: Edit | d: Delete | t: Type | i: Import | w: Write"),
    ]);
    let status = Line::from(Span::styled(
        app.status.clone(),
        Style::default().add_modifier(Modifier::ITALIC),
    ));
    f.render_widget(Paragraph::new(vec![status, help_text]), outer[1]);

    match &app.mode {
        Mode::Browse => {}
        Mode::Adding(focus) | Mode::Editing(focus) => {
            let adding = matches!(app.mode, Mode::Adding(_));
            let title = if adding { "Add New Field" } else { "Edit Field" };
            let mut lines = app.form_lines(*focus, adding);
            lines.push(Line::from(""));
            lines.push(Line::from("Tab: Next | ←/→: Type | Enter: Save | Esc: Cancel"));
            render_popup(f, title, lines, Color::Cyan);
        }
        Mode::Prompt { kind, input } => {
            let lines = vec![
                Line::from(format!("{input}_")),
                Line::from(""),
                Line::from("Enter: OK | Esc: Cancel"),
            ];
            render_popup(f, kind.title(), lines, Color::Cyan);
        }
        Mode::Error(message) => {
            let lines = vec![
                Line::from(message.clone()),
                Line::from(""),
                Line::from("Press any key"),
            ];
            render_popup(f, "Error", lines, Color::Red);
        }
    }
}

fn render_popup(f: &mut Frame, title: &str, lines: Vec<Line>, border: Color) {
    let height = lines.len() as u16 + 2;
    let area = centered_rect(60, height, f.area());
    let popup = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(title.to_string()),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn centered_rect(percent_x: u16, height: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(height),
            Constraint::Fill(1),
        ])
        .split(area);
    let side = (100 - percent_x) / 2;
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(side),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(side),
        ])
        .split(vertical[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn app_with(content: &str) -> App {
        let config = Config {
            initial_content: Some(content.to_string()),
            ..Config::default()
        };
        App::new(&config).unwrap()
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn type_keys(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn test_sidebar_lists_categories_then_expanded_fields() {
        // Given a document with fields in an expanded and a collapsed category
        let app = app_with("{{customer.name}} {{total}}");

        // Then the expanded category shows its field, the collapsed one does not
        let customer = app.panel.registry().find_by_name("customer.name").unwrap();
        assert_eq!(
            app.rows,
            vec![
                SidebarRow::Category("customer".to_string()),
                SidebarRow::Field(customer.id),
                SidebarRow::Category("general".to_string()),
            ]
        );
        assert_eq!(app.list_state.selected(), Some(0));
    }

    #[test]
    fn test_space_toggles_selected_category() {
        let mut app = app_with("{{total}}");
        assert_eq!(app.rows.len(), 1);

        press(&mut app, KeyCode::Char(' '));

        assert!(app.panel.is_expanded("general"));
        assert_eq!(app.rows.len(), 2);
    }

    #[test]
    fn test_add_form_inserts_token() {
        // Given an empty document
        let mut app = app_with("");

        // When a field is added through the form
        press(&mut app, KeyCode::Char('a'));
        type_keys(&mut app, "customer.email");
        press(&mut app, KeyCode::Enter);

        // Then its token is in the document and the registry
        assert_eq!(app.mode, Mode::Browse);
        assert_eq!(app.content(), "{{customer.email}} ");
        assert!(app.panel.registry().find_by_name("customer.email").is_some());
    }

    #[test]
    fn test_add_form_requires_name() {
        let mut app = app_with("");

        press(&mut app, KeyCode::Char('a'));
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.mode, Mode::Adding(FormField::Name));
        assert_eq!(app.content(), "");
    }

    #[test]
    fn test_add_form_escape_cancels() {
        let mut app = app_with("");

        press(&mut app, KeyCode::Char('a'));
        type_keys(&mut app, "x");
        press(&mut app, KeyCode::Esc);

        assert_eq!(app.mode, Mode::Browse);
        assert!(!app.panel.is_adding());
        assert!(app.panel.registry().is_empty());
    }

    #[test]
    fn test_add_form_type_cycles_with_arrows() {
        let mut app = app_with("");

        press(&mut app, KeyCode::Char('a'));
        type_keys(&mut app, "logo");
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Left);

        assert_eq!(app.panel.draft().unwrap().field_type, FieldType::String.prev());
    }

    #[test]
    fn test_edit_form_renames_tokens() {
        // Given a field row selected
        let mut app = app_with("Dear {{customer.name}}");
        press(&mut app, KeyCode::Down);

        // When its name is changed and saved
        press(&mut app, KeyCode::Char('e'));
        for _ in 0.."name".len() {
            press(&mut app, KeyCode::Backspace);
        }
        type_keys(&mut app, "full");
        press(&mut app, KeyCode::Enter);

        // Then the document follows the new name
        assert_eq!(app.content(), "Dear {{customer.full}}");
        assert!(app.panel.editing().is_none());
    }

    #[test]
    fn test_delete_strips_token() {
        let mut app = app_with("Hello {{customer.name}}");
        press(&mut app, KeyCode::Down);

        press(&mut app, KeyCode::Char('d'));

        assert_eq!(app.content(), "Hello ");
        assert!(app.panel.registry().is_empty());
        assert!(app.rows.is_empty());
        assert_eq!(app.list_state.selected(), None);
    }

    #[test]
    fn test_typed_text_discovers_fields() {
        let mut app = app_with("");

        press(&mut app, KeyCode::Char('t'));
        type_keys(&mut app, "Total: {{invoice.total}}");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.content(), "Total: {{invoice.total}}");
        assert!(app.panel.registry().find_by_name("invoice.total").is_some());
    }

    #[test]
    fn test_import_key_opens_prompt_in_import_dir() {
        let config = Config {
            import_dir: Some(PathBuf::from("/docs")),
            ..Config::default()
        };
        let mut app = App::new(&config).unwrap();

        press(&mut app, KeyCode::Char('i'));

        assert_eq!(
            app.mode,
            Mode::Prompt {
                kind: Prompt::ImportPath,
                input: "/docs/".to_string()
            }
        );
    }

    #[test]
    fn test_failed_import_blocks_until_key_press() {
        // Given an import of a file that does not exist
        let mut app = app_with("keep me");
        press(&mut app, KeyCode::Char('i'));
        type_keys(&mut app, "/nonexistent/letter.docx");
        press(&mut app, KeyCode::Enter);

        // Then an error is shown and the document is untouched
        assert!(matches!(app.mode, Mode::Error(_)));
        assert_eq!(app.content(), "keep me");

        // And any key dismisses it
        press(&mut app, KeyCode::Char('x'));
        assert_eq!(app.mode, Mode::Browse);
    }

    #[test]
    fn test_write_saves_document() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("out.html");
        let mut app = app_with("<p>{{customer.name}}</p>");

        press(&mut app, KeyCode::Char('w'));
        type_keys(&mut app, &target.to_string_lossy());
        press(&mut app, KeyCode::Enter);

        assert_eq!(fs::read_to_string(&target).unwrap(), "<p>{{customer.name}}</p>");
    }

    #[test]
    fn test_open_text_file_replaces_document() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("letter.html");
        fs::write(&path, "<p>{{order.id}}</p>").unwrap();
        let mut app = app_with("");

        app.open(&path).unwrap();

        assert_eq!(app.content(), "<p>{{order.id}}</p>");
        assert!(app.panel.registry().find_by_name("order.id").is_some());
    }

    #[test]
    fn test_rust_log_overrides_default_level() {
        unsafe {
            env::remove_var("RUST_LOG");
        }
        let default_filter = logger(env_logger::Target::Stderr).build().filter();

        unsafe {
            env::set_var("RUST_LOG", "debug");
        }
        let overridden = logger(env_logger::Target::Stderr).build().filter();
        unsafe {
            env::remove_var("RUST_LOG");
        }

        assert_eq!(default_filter, log::LevelFilter::Info);
        assert_eq!(overridden, log::LevelFilter::Debug);
    }

    #[test]
    fn test_unknown_sync_event_is_rejected() {
        let config = Config {
            sync_events: "change blur".to_string(),
            ..Config::default()
        };

        let result = App::new(&config);

        assert!(result.is_err());
    }

    #[test]
    fn test_q_quits_only_when_browsing() {
        let mut app = app_with("");

        press(&mut app, KeyCode::Char('t'));
        assert!(!press(&mut app, KeyCode::Char('q')));
        press(&mut app, KeyCode::Esc);

        assert!(press(&mut app, KeyCode::Char('q')));
    }
}
