use crate::error::Result;
use crate::models::application::ApplicationSummary;
use crate::models::job::Job;
use rust_xlsxwriter::*;

pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub struct ExportService;

impl ExportService {
    fn stage_color(stage: &str) -> Color {
        match stage {
            "applied" => Color::RGB(0x3B82F6),
            "screening" | "shortlisted" => Color::RGB(0xF59E0B),
            "interviewing" | "offered" => Color::RGB(0x8B5CF6),
            "hired" => Color::RGB(0x10B981),
            "rejected" | "withdrawn" => Color::RGB(0xEF4444),
            _ => Color::RGB(0x64748B),
        }
    }

    fn score_color(score: i32) -> Color {
        if score >= 70 {
            Color::RGB(0x10B981)
        } else if score >= 40 {
            Color::RGB(0xF59E0B)
        } else {
            Color::RGB(0xEF4444)
        }
    }

    pub fn file_name(job: &Job) -> String {
        let slug: String = job
            .title
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
            .collect();
        format!(
            "applications_{}_{}.xlsx",
            slug.trim_matches('_'),
            chrono::Utc::now().format("%Y%m%d")
        )
    }

    /// Styled workbook with one row per application of `job`.
    pub fn generate_applications_xlsx(job: &Job, applications: &[ApplicationSummary]) -> Result<Vec<u8>> {
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        worksheet.set_name("Applications")?;

        let primary_color = Color::RGB(0x1E293B);
        let header_bg = Color::RGB(0x0F172A);
        let border_color = Color::RGB(0xE2E8F0);

        let columns = [
            ("#", 6.0),
            ("Candidate", 30.0),
            ("Email", 32.0),
            ("Stage", 16.0),
            ("Match score", 14.0),
            ("Summary", 60.0),
            ("Applied", 18.0),
            ("Last update", 18.0),
        ];
        let last_col = (columns.len() - 1) as u16;
        for (i, (_, width)) in columns.iter().enumerate() {
            worksheet.set_column_width(i as u16, *width)?;
        }

        let title_format = Format::new()
            .set_font_size(16)
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross)
            .set_align(FormatAlign::VerticalCenter);
        worksheet.set_row_height(0, 36)?;
        worksheet.merge_range(0, 0, 0, last_col, &job.title, &title_format)?;

        let subtitle_format = Format::new()
            .set_font_size(10)
            .set_italic()
            .set_font_color(Color::RGB(0x94A3B8))
            .set_background_color(primary_color)
            .set_align(FormatAlign::CenterAcross);
        let subtitle = format!(
            "{} | status: {} | exported {} | {} applications",
            job.location,
            job.status,
            chrono::Utc::now().format("%Y-%m-%d %H:%M UTC"),
            applications.len()
        );
        worksheet.merge_range(1, 0, 1, last_col, &subtitle, &subtitle_format)?;

        let header_format = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(Color::White)
            .set_background_color(header_bg)
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);
        let header_row = 2;
        worksheet.set_row_height(header_row, 26)?;
        for (i, (name, _)) in columns.iter().enumerate() {
            worksheet.write_string_with_format(header_row, i as u16, *name, &header_format)?;
        }

        let data_start_row = 3;
        for (idx, app) in applications.iter().enumerate() {
            let row = data_start_row + idx as u32;
            let bg = if idx % 2 == 0 { Color::RGB(0xF8FAFC) } else { Color::White };
            let base_fmt = Format::new()
                .set_font_size(10)
                .set_background_color(bg)
                .set_align(FormatAlign::VerticalCenter)
                .set_border(FormatBorder::Thin)
                .set_border_color(border_color);
            let center_fmt = base_fmt.clone().set_align(FormatAlign::Center);
            let wrap_fmt = base_fmt.clone().set_text_wrap();

            worksheet.write_number_with_format(row, 0, (idx + 1) as f64, &center_fmt)?;
            worksheet.write_string_with_format(row, 1, &app.candidate_name, &base_fmt.clone().set_bold())?;
            worksheet.write_string_with_format(row, 2, &app.candidate_email, &base_fmt)?;

            let stage_fmt = center_fmt
                .clone()
                .set_bold()
                .set_font_color(Color::White)
                .set_background_color(Self::stage_color(&app.stage));
            worksheet.write_string_with_format(row, 3, &app.stage, &stage_fmt)?;

            match app.match_score {
                Some(score) => {
                    let score_fmt = center_fmt.clone().set_bold().set_font_color(Self::score_color(score));
                    worksheet.write_number_with_format(row, 4, score as f64, &score_fmt)?;
                }
                None => {
                    worksheet.write_string_with_format(row, 4, "-", &center_fmt)?;
                }
            }

            worksheet.write_string_with_format(row, 5, app.match_summary.as_deref().unwrap_or("-"), &wrap_fmt)?;
            worksheet.write_string_with_format(row, 6, &app.created_at.format("%Y-%m-%d %H:%M").to_string(), &center_fmt)?;
            worksheet.write_string_with_format(row, 7, &app.updated_at.format("%Y-%m-%d %H:%M").to_string(), &center_fmt)?;
        }

        let scores: Vec<i32> = applications.iter().filter_map(|a| a.match_score).collect();
        let average = if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<i32>() as f64 / scores.len() as f64
        };
        let summary_row = data_start_row + applications.len() as u32 + 1;
        let summary_fmt = Format::new()
            .set_bold()
            .set_font_size(10)
            .set_font_color(primary_color)
            .set_background_color(Color::RGB(0xE0E7FF))
            .set_align(FormatAlign::Center)
            .set_border(FormatBorder::Thin)
            .set_border_color(border_color);
        let summary = format!(
            "Total: {} | Scored: {} | Average score: {:.0} | Strong matches (70+): {}",
            applications.len(),
            scores.len(),
            average,
            scores.iter().filter(|s| **s >= 70).count()
        );
        worksheet.merge_range(summary_row, 0, summary_row, last_col, &summary, &summary_fmt)?;

        worksheet.set_freeze_panes(3, 0)?;
        let last_data_row = (data_start_row + applications.len() as u32).saturating_sub(1).max(header_row);
        worksheet.autofilter(header_row, 0, last_data_row, last_col)?;

        Ok(workbook.save_to_buffer()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn job() -> Job {
        Job {
            id: Uuid::new_v4(),
            title: "Senior Rust Engineer".into(),
            department: None,
            location: "Remote".into(),
            employment_type: None,
            description: "Build things".into(),
            requirements: None,
            skills: vec!["rust".into()],
            min_experience_years: None,
            salary_min: None,
            salary_max: None,
            openings: 1,
            status: "active".into(),
            created_by: None,
            published_at: None,
            closed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn summary(score: Option<i32>) -> ApplicationSummary {
        ApplicationSummary {
            id: Uuid::new_v4(),
            candidate_id: Uuid::new_v4(),
            candidate_name: "Ana Lima".into(),
            candidate_email: "ana@example.com".into(),
            job_id: Uuid::new_v4(),
            job_title: "Senior Rust Engineer".into(),
            stage: "screening".into(),
            match_score: score,
            match_summary: Some("Solid match".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn workbook_is_a_zip_archive() {
        let bytes = ExportService::generate_applications_xlsx(&job(), &[summary(Some(82)), summary(None)]).unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_export_still_builds() {
        let bytes = ExportService::generate_applications_xlsx(&job(), &[]).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn file_name_is_slugged() {
        let name = ExportService::file_name(&job());
        assert!(name.starts_with("applications_senior_rust_engineer_"));
        assert!(name.ends_with(".xlsx"));
    }
}
