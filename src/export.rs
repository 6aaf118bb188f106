//! Text formats shared by the exports: dates, the clipboard list, the report message and the
//! SMS recipient lists.

use chrono::{Datelike, NaiveDate};

use crate::dashboard::Absentee;
use crate::models::{AbsenceKind, Residence};
use crate::settings::ReportSettings;

const WEEKDAYS: [&str; 7] = ["월", "화", "수", "목", "금", "토", "일"];

pub fn weekday_ko(date: NaiveDate) -> &'static str {
    WEEKDAYS[date.weekday().num_days_from_monday() as usize]
}

/// `1월 7일(수)`
pub fn display_date(date: NaiveDate) -> String {
    format!("{}월 {}일({})", date.month(), date.day(), weekday_ko(date))
}

/// The spreadsheet tab for a date: `1/7(수)`.
pub fn sheet_name(date: NaiveDate) -> String {
    format!("{}/{}({})", date.month(), date.day(), weekday_ko(date))
}

/// The absentee list as pasted into chat: a title, then one block per grade.
pub fn clipboard_text(date: NaiveDate, absentees: &[Absentee]) -> String {
    let title = display_date(date);
    if absentees.is_empty() {
        return format!("{title} 결석자 없음");
    }

    let mut blocks = vec![format!("{title} 결석자 명단 (총 {}명)", absentees.len())];
    for grade in [1, 2] {
        let members: Vec<&Absentee> = absentees.iter().filter(|a| a.grade == grade).collect();
        if members.is_empty() {
            continue;
        }

        let mut block = format!("[{grade}학년] {}명", members.len());
        for absentee in members {
            block.push('\n');
            block.push_str(&absentee.seat_id);
            block.push('\t');
            block.push_str(&absentee.name);
            if !absentee.note.is_empty() {
                block.push('\t');
                block.push_str(&absentee.note);
            }
        }
        blocks.push(block);
    }

    blocks.join("\n\n")
}

/// The daily report sent to the department head.
pub fn report_message(date: NaiveDate, absentee_count: usize, report: &ReportSettings) -> String {
    let mut lines = vec![
        format!("안녕하세요, {}.", report.addressee),
        format!("{} {} 출결현황 보내드립니다.", display_date(date), report.program_name),
        format!("총 {absentee_count}명의 학생 및 학부모님께 알림 발송 완료했습니다."),
    ];
    if let Some(link) = report.sheet_link.as_deref().filter(|link| !link.trim().is_empty()) {
        lines.push(format!("[조간면학일지 스프레드시트] {link}"));
    }
    lines.push("감사합니다.".to_string());
    lines.join("\n")
}

/// Who receives the absence text message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsCategory {
    /// Commuting students: the student and a parent.
    Commute,
    /// Dormitory students on registered overnight leave: a parent only.
    DormOvernight,
    /// Other dormitory students: the student only.
    DormStay,
}

impl SmsCategory {
    pub const ALL: [SmsCategory; 3] = [Self::Commute, Self::DormOvernight, Self::DormStay];

    pub fn header(self) -> &'static str {
        match self {
            Self::Commute => "[통학생 - 학생+학부모]",
            Self::DormOvernight => "[기숙사 외박 - 학부모만]",
            Self::DormStay => "[기숙사 외박X - 학생만]",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Commute => "통학생",
            Self::DormOvernight => "기숙 외박",
            Self::DormStay => "기숙 외박X",
        }
    }

    pub fn of(absentee: &Absentee) -> Self {
        match absentee.residence {
            Residence::Commute => Self::Commute,
            Residence::Dormitory
                if absentee
                    .pre_absence
                    .as_ref()
                    .is_some_and(|entry| entry.kind == AbsenceKind::Overnight) =>
            {
                Self::DormOvernight
            }
            Residence::Dormitory => Self::DormStay,
        }
    }
}

/// Absentees split by SMS recipient group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SmsLists {
    pub commute: Vec<Absentee>,
    pub dorm_overnight: Vec<Absentee>,
    pub dorm_stay: Vec<Absentee>,
}

impl SmsLists {
    /// Splits `absentees`. With `exclude_pre_absence`, students with a registered absence are left
    /// out of the commute and dormitory-stay lists; overnight leave is always notified.
    pub fn categorize(absentees: &[Absentee], exclude_pre_absence: bool) -> Self {
        let mut lists = Self::default();
        for absentee in absentees {
            let category = SmsCategory::of(absentee);
            if exclude_pre_absence
                && absentee.is_pre_absent()
                && category != SmsCategory::DormOvernight
            {
                continue;
            }
            lists.get_mut(category).push(absentee.clone());
        }
        lists
    }

    pub fn get(&self, category: SmsCategory) -> &[Absentee] {
        match category {
            SmsCategory::Commute => &self.commute,
            SmsCategory::DormOvernight => &self.dorm_overnight,
            SmsCategory::DormStay => &self.dorm_stay,
        }
    }

    fn get_mut(&mut self, category: SmsCategory) -> &mut Vec<Absentee> {
        match category {
            SmsCategory::Commute => &mut self.commute,
            SmsCategory::DormOvernight => &mut self.dorm_overnight,
            SmsCategory::DormStay => &mut self.dorm_stay,
        }
    }

    pub fn len(&self) -> usize {
        self.commute.len() + self.dorm_overnight.len() + self.dorm_stay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every listed student, in category order.
    pub fn all(&self) -> impl Iterator<Item = &Absentee> {
        SmsCategory::ALL.into_iter().flat_map(|category| self.get(category))
    }

    /// All non-empty categories, each under its header.
    pub fn all_categories_text(&self) -> String {
        SmsCategory::ALL
            .into_iter()
            .filter(|category| !self.get(*category).is_empty())
            .map(|category| format!("{}\n{}", category.header(), category_text(self.get(category))))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// `<student id> <name>`, one per line.
pub fn category_text(absentees: &[Absentee]) -> String {
    absentees
        .iter()
        .map(|absentee| format!("{} {}", absentee.student_id, absentee.name))
        .collect::<Vec<_>>()
        .join("\n")
}
