use eframe::egui;
use studentd::model::{normalize_email, parse_date_of_birth, parse_enrollment_year};
use studentd::{Student, StudentInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormAction {
    None,
    Save,
    Cancel,
}

/// Add/Edit dialog state. Fields hold raw text until Save.
#[derive(Debug, Clone, Default)]
pub struct StudentForm {
    pub editing: Option<i64>,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub date_of_birth: String,
    pub enrollment_year: String,
    pub error: Option<String>,
}

impl StudentForm {
    pub fn new_add() -> Self {
        Self::default()
    }

    pub fn new_edit(s: &Student) -> Self {
        Self {
            editing: Some(s.id),
            full_name: s.full_name.clone(),
            email: s.email.clone(),
            phone: s.phone.clone().unwrap_or_default(),
            address: s.address.clone().unwrap_or_default(),
            date_of_birth: s.date_of_birth_text(),
            enrollment_year: s.enrollment_year_text(),
            error: None,
        }
    }

    pub fn title(&self) -> &'static str {
        if self.editing.is_some() {
            "Edit Student"
        } else {
            "Add Student"
        }
    }

    /// Check the fields in dialog order and build the record input.
    pub fn validate(&self) -> Result<StudentInput, String> {
        let full_name = self.full_name.trim().to_string();
        let email = normalize_email(&self.email);

        if full_name.is_empty() {
            return Err("Full name is required.".to_string());
        }
        if email.is_empty() || !email.contains('@') {
            return Err("A valid email is required.".to_string());
        }
        let date_of_birth = parse_date_of_birth(&self.date_of_birth).map_err(|e| e.to_string())?;
        let enrollment_year =
            parse_enrollment_year(&self.enrollment_year).map_err(|e| e.to_string())?;

        Ok(StudentInput {
            full_name,
            email,
            phone: Some(self.phone.trim().to_string()),
            address: Some(self.address.trim().to_string()),
            date_of_birth,
            enrollment_year,
        })
    }

    pub fn show(&mut self, ctx: &egui::Context) -> FormAction {
        let mut action = FormAction::None;

        egui::Window::new(self.title())
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .show(ctx, |ui| {
                egui::Grid::new("student_form")
                    .num_columns(2)
                    .spacing([12.0, 6.0])
                    .show(ui, |ui| {
                        let rows: [(&str, &mut String); 6] = [
                            ("Full name", &mut self.full_name),
                            ("Email", &mut self.email),
                            ("Phone", &mut self.phone),
                            ("Address", &mut self.address),
                            ("Date of Birth (YYYY-MM-DD)", &mut self.date_of_birth),
                            ("Enrollment Year", &mut self.enrollment_year),
                        ];
                        for (label, value) in rows {
                            ui.label(label);
                            ui.add(egui::TextEdit::singleline(value).desired_width(280.0));
                            ui.end_row();
                        }
                    });

                if let Some(msg) = &self.error {
                    ui.add_space(6.0);
                    ui.colored_label(ui.visuals().error_fg_color, msg);
                }

                ui.add_space(10.0);
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if ui.button("Cancel").clicked() {
                        action = FormAction::Cancel;
                    }
                    if ui.button("Save").clicked() {
                        action = FormAction::Save;
                    }
                });
            });

        if action == FormAction::None {
            ctx.input(|i| {
                if i.key_pressed(egui::Key::Escape) {
                    action = FormAction::Cancel;
                } else if i.key_pressed(egui::Key::Enter) {
                    action = FormAction::Save;
                }
            });
        }
        action
    }
}
