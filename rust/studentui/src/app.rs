use std::collections::BTreeSet;
use std::path::PathBuf;

use eframe::egui;
use egui_extras::{Column, TableBuilder};
use rusqlite::Connection;
use studentd::config::{save_settings_best_effort, AppPaths, Settings};
use studentd::{exchange, students, Student, StudentPatch};

use crate::form::{FormAction, StudentForm};

const COLUMN_TITLES: [&str; 7] = [
    "Id",
    "Full Name",
    "Email",
    "Phone",
    "Address",
    "Date Of Birth",
    "Enrollment Year",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClickMode {
    Replace,
    Toggle,
    Range,
}

struct Notice {
    text: String,
    is_error: bool,
}

pub struct StudentsApp {
    conn: Connection,
    paths: AppPaths,
    settings: Settings,
    search: String,
    rows: Vec<Student>,
    selected: BTreeSet<i64>,
    /// Row that Shift-click ranges start from.
    anchor: Option<i64>,
    form: Option<StudentForm>,
    /// Ids shown in the open delete confirmation.
    confirm_delete: Option<Vec<i64>>,
    notice: Option<Notice>,
    applied_dark: Option<bool>,
    window_size: Option<(f32, f32)>,
    maximized: bool,
}

impl StudentsApp {
    pub fn new(conn: Connection, paths: AppPaths, settings: Settings) -> Self {
        let maximized = settings.zoomed;
        let mut app = Self {
            conn,
            paths,
            settings,
            search: String::new(),
            rows: Vec::new(),
            selected: BTreeSet::new(),
            anchor: None,
            form: None,
            confirm_delete: None,
            notice: None,
            applied_dark: None,
            window_size: None,
            maximized,
        };
        app.refresh();
        app
    }

    fn active_query(&self) -> Option<String> {
        let q = self.search.trim();
        (!q.is_empty()).then(|| q.to_string())
    }

    fn refresh(&mut self) {
        match students::list_students(&self.conn, self.active_query().as_deref()) {
            Ok(rows) => {
                self.selected.retain(|id| rows.iter().any(|s| s.id == *id));
                self.rows = rows;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to load students");
                self.error(format!("Could not load students: {e}"));
            }
        }
    }

    fn info(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error: false,
        });
    }

    fn error(&mut self, text: impl Into<String>) {
        self.notice = Some(Notice {
            text: text.into(),
            is_error: true,
        });
    }

    fn on_edit(&mut self) {
        let ids: Vec<i64> = self.selected.iter().copied().collect();
        match ids.as_slice() {
            [] => self.info("Please select a row to edit."),
            [id] => match students::get_student(&self.conn, *id) {
                Ok(Some(s)) => self.form = Some(StudentForm::new_edit(&s)),
                Ok(None) => {
                    self.info("The selected student no longer exists.");
                    self.refresh();
                }
                Err(e) => self.error(e.to_string()),
            },
            _ => self.info("Please select only one row to edit."),
        }
    }

    fn on_delete(&mut self) {
        if self.selected.is_empty() {
            self.info("Please select at least one row to delete.");
            return;
        }
        self.confirm_delete = Some(self.selected.iter().copied().collect());
    }

    fn delete_confirmed(&mut self, ids: &[i64]) {
        match students::delete_students(&self.conn, ids) {
            Ok(n) => {
                tracing::info!(deleted = n, "deleted students");
                self.selected.clear();
                self.refresh();
            }
            Err(e) => self.error(e.to_string()),
        }
    }

    fn save_form(&mut self) {
        let Some(form) = self.form.as_mut() else {
            return;
        };
        let input = match form.validate() {
            Ok(v) => v,
            Err(msg) => {
                form.error = Some(msg);
                return;
            }
        };
        let saved = match form.editing {
            None => students::create_student(&self.conn, input).map(Some),
            Some(id) => students::update_student(&self.conn, id, StudentPatch::replace_all(input)),
        };
        match saved {
            Ok(Some(_)) => {
                self.form = None;
                self.refresh();
            }
            Ok(None) => {
                self.form = None;
                self.info("The selected student no longer exists.");
                self.refresh();
            }
            Err(e) => form.error = Some(e.to_string()),
        }
    }

    fn on_import(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Import Students CSV")
            .add_filter("CSV Files", &["csv"])
            .add_filter("All Files", &["*"])
            .pick_file()
        else {
            return;
        };
        match exchange::import_students_csv(&self.conn, &path) {
            Ok(summary) => {
                for w in &summary.warnings {
                    tracing::debug!(line = w.line, code = w.code, "{}", w.message);
                }
                self.info(format!("Imported {} students.", summary.created));
            }
            Err(e) => self.error(format!("Import failed: {e}")),
        }
        self.refresh();
    }

    fn on_export(&mut self) {
        let Some(path) = rfd::FileDialog::new()
            .set_title("Export Students CSV")
            .set_file_name("students.csv")
            .add_filter("CSV Files", &["csv"])
            .add_filter("All Files", &["*"])
            .save_file()
        else {
            return;
        };
        let path = with_default_extension(path);
        match exchange::export_students_csv(&self.conn, &path, self.active_query().as_deref()) {
            Ok(n) => self.info(format!("Exported {n} students.")),
            Err(e) => self.error(format!("Export failed: {e}")),
        }
    }

    fn on_toggle_theme(&mut self) {
        self.settings.toggle_theme();
        save_settings_best_effort(&self.paths.settings_path(), &self.settings);
    }

    fn save_window_state(&mut self) {
        if let Some((w, h)) = self.window_size {
            self.settings.set_window_size(w, h);
        }
        self.settings.zoomed = self.maximized;
        save_settings_best_effort(&self.paths.settings_path(), &self.settings);
    }

    fn click_row(&mut self, id: i64, mode: ClickMode) {
        let position = |target: i64| self.rows.iter().position(|s| s.id == target);
        match mode {
            ClickMode::Range => {
                let span = self.anchor.and_then(position).zip(position(id));
                if let Some((a, b)) = span {
                    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
                    self.selected = self.rows[lo..=hi].iter().map(|s| s.id).collect();
                    return;
                }
                self.selected.clear();
                self.selected.insert(id);
            }
            ClickMode::Toggle => {
                if !self.selected.remove(&id) {
                    self.selected.insert(id);
                }
            }
            ClickMode::Replace => {
                self.selected.clear();
                self.selected.insert(id);
            }
        }
        self.anchor = Some(id);
    }

    fn modal_open(&self) -> bool {
        self.form.is_some() || self.confirm_delete.is_some() || self.notice.is_some()
    }

    fn render_toolbar(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            let search = ui.add(egui::TextEdit::singleline(&mut self.search).desired_width(320.0));
            let enter = search.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Search").clicked() || enter {
                self.refresh();
            }
            if ui.button("Add").clicked() {
                self.form = Some(StudentForm::new_add());
            }
            if ui.button("Edit").clicked() {
                self.on_edit();
            }
            if ui.button("Delete").clicked() {
                self.on_delete();
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Import CSV").clicked() {
                self.on_import();
            }
            if ui.button("Export CSV").clicked() {
                self.on_export();
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("Toggle Theme").clicked() {
                    self.on_toggle_theme();
                }
            });
        });
    }

    fn render_table(&mut self, ui: &mut egui::Ui) {
        let mode = ui.input(|i| {
            if i.modifiers.shift {
                ClickMode::Range
            } else if i.modifiers.command {
                ClickMode::Toggle
            } else {
                ClickMode::Replace
            }
        });
        let blocked = self.modal_open();
        let mut clicked: Option<i64> = None;
        let mut double_clicked: Option<i64> = None;

        TableBuilder::new(ui)
            .striped(true)
            .resizable(true)
            .sense(egui::Sense::click())
            .cell_layout(egui::Layout::left_to_right(egui::Align::Center))
            .column(Column::exact(50.0))
            .columns(Column::initial(140.0).at_least(60.0), 3)
            .column(Column::initial(240.0).at_least(80.0))
            .column(Column::initial(120.0).at_least(60.0))
            .column(Column::remainder())
            .header(22.0, |mut header| {
                for title in COLUMN_TITLES {
                    header.col(|ui| {
                        ui.strong(title);
                    });
                }
            })
            .body(|body| {
                body.rows(20.0, self.rows.len(), |mut row| {
                    let s = &self.rows[row.index()];
                    row.set_selected(self.selected.contains(&s.id));
                    for text in row_cells(s) {
                        row.col(|ui| {
                            ui.label(text);
                        });
                    }
                    let resp = row.response();
                    if resp.double_clicked() {
                        double_clicked = Some(s.id);
                    } else if resp.clicked() {
                        clicked = Some(s.id);
                    }
                });
            });

        if blocked {
            return;
        }
        if let Some(id) = clicked {
            self.click_row(id, mode);
        }
        if let Some(id) = double_clicked {
            self.click_row(id, ClickMode::Replace);
            self.on_edit();
        }
    }

    fn render_dialogs(&mut self, ctx: &egui::Context) {
        if let Some(form) = self.form.as_mut() {
            match form.show(ctx) {
                FormAction::Save => self.save_form(),
                FormAction::Cancel => self.form = None,
                FormAction::None => {}
            }
        }

        if let Some(ids) = self.confirm_delete.clone() {
            let mut answer: Option<bool> = None;
            egui::Window::new("Confirm")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label("Delete selected students? This cannot be undone.");
                    ui.small(format!("{} selected", ids.len()));
                    ui.add_space(8.0);
                    ui.horizontal(|ui| {
                        if ui.button("OK").clicked() {
                            answer = Some(true);
                        }
                        if ui.button("Cancel").clicked() {
                            answer = Some(false);
                        }
                    });
                });
            if let Some(yes) = answer {
                self.confirm_delete = None;
                if yes {
                    self.delete_confirmed(&ids);
                }
            }
        }

        if let Some(notice) = &self.notice {
            let mut dismissed = false;
            let title = if notice.is_error { "Error" } else { "Info" };
            egui::Window::new(title)
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .show(ctx, |ui| {
                    ui.label(&notice.text);
                    ui.add_space(8.0);
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
            if dismissed {
                self.notice = None;
            }
        }
    }

    fn track_viewport(&mut self, ctx: &egui::Context) -> bool {
        let (rect, maximized, close) = ctx.input(|i| {
            let vp = i.viewport();
            (vp.inner_rect, vp.maximized, vp.close_requested())
        });
        self.maximized = maximized.unwrap_or(self.maximized);
        if let Some(r) = rect {
            if !self.maximized {
                self.window_size = Some((r.width(), r.height()));
            }
        }
        close
    }
}

fn row_cells(s: &Student) -> [String; 7] {
    [
        s.id.to_string(),
        s.full_name.clone(),
        s.email.clone(),
        s.phone.clone().unwrap_or_default(),
        s.address.clone().unwrap_or_default(),
        s.date_of_birth_text(),
        s.enrollment_year_text(),
    ]
}

fn with_default_extension(path: PathBuf) -> PathBuf {
    if path.extension().is_some() {
        path
    } else {
        path.with_extension("csv")
    }
}

impl eframe::App for StudentsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let dark = self.settings.is_dark();
        if self.applied_dark != Some(dark) {
            ctx.set_visuals(if dark {
                egui::Visuals::dark()
            } else {
                egui::Visuals::light()
            });
            self.applied_dark = Some(dark);
        }

        if self.track_viewport(ctx) {
            self.save_window_state();
        }

        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            ui.add_space(6.0);
            self.render_toolbar(ui);
            ui.add_space(6.0);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.render_table(ui);
        });

        self.render_dialogs(ctx);
    }
}
