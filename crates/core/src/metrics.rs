//! Derived progress figures. Nothing in here is persisted; every value is
//! recomputed from lesson progress records on read.

use serde::Serialize;

use crate::model::{CourseId, LessonId, LessonProgress, ProgressFlag};

/// Highest level a learner can reach by completing courses.
pub const MAX_LEARNER_LEVEL: u32 = 25;

/// Percentage of `completed` over `total`, rounded to the nearest integer
/// (halves round up).
///
/// Returns 0 for an empty course and never exceeds 100.
#[must_use]
pub fn completion_percent(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    let rounded = (completed * 200 + total) / (total * 2);
    u8::try_from(rounded).unwrap_or(100)
}

/// Learner level derived from the number of fully completed courses.
#[must_use]
pub fn learner_level(completed_courses: u32) -> u32 {
    completed_courses.min(MAX_LEARNER_LEVEL)
}

/// Completion summary for one learner on one course.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CourseProgress {
    pub course_id: CourseId,
    pub completed_lessons: u32,
    pub total_lessons: u32,
    pub percent: u8,
}

impl CourseProgress {
    #[must_use]
    pub fn new(course_id: CourseId, completed_lessons: u32, total_lessons: u32) -> Self {
        let completed_lessons = completed_lessons.min(total_lessons);
        Self {
            course_id,
            completed_lessons,
            total_lessons,
            percent: completion_percent(completed_lessons, total_lessons),
        }
    }

    /// A course counts as complete once every lesson is. Empty courses never do.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.total_lessons > 0 && self.completed_lessons == self.total_lessons
    }
}

/// Number of courses in `overview` that are fully complete.
#[must_use]
pub fn completed_courses(overview: &[CourseProgress]) -> u32 {
    let count = overview.iter().filter(|c| c.is_complete()).count();
    u32::try_from(count).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlagCount {
    pub flag: ProgressFlag,
    pub learners: u32,
}

/// How learners interacted with one lesson, for the admin panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LessonEngagement {
    pub lesson_id: LessonId,
    pub learners: u32,
    pub completed: u32,
    pub flags: Vec<FlagCount>,
}

impl LessonEngagement {
    /// Aggregates every learner's record for `lesson_id`. Records for other
    /// lessons are ignored.
    #[must_use]
    pub fn from_records(lesson_id: LessonId, records: &[LessonProgress]) -> Self {
        let relevant: Vec<&LessonProgress> = records
            .iter()
            .filter(|r| r.lesson_id() == lesson_id)
            .collect();
        let count = |pred: &dyn Fn(&LessonProgress) -> bool| -> u32 {
            let n = relevant.iter().filter(|r| pred(**r)).count();
            u32::try_from(n).unwrap_or(u32::MAX)
        };

        let flags = ProgressFlag::ALL
            .into_iter()
            .map(|flag| FlagCount {
                flag,
                learners: count(&|r: &LessonProgress| r.flag(flag)),
            })
            .collect();

        Self {
            lesson_id,
            learners: count(&|_: &LessonProgress| true),
            completed: count(&|r: &LessonProgress| r.is_completed()),
            flags,
        }
    }

    #[must_use]
    pub fn learners_with(&self, flag: ProgressFlag) -> u32 {
        self.flags
            .iter()
            .find(|f| f.flag == flag)
            .map_or(0, |f| f.learners)
    }

    #[must_use]
    pub fn completion_percent(&self) -> u8 {
        completion_percent(self.completed, self.learners)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UserId;
    use crate::time::fixed_now;

    #[test]
    fn empty_course_is_zero_percent() {
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(CourseProgress::new(CourseId::new(1), 0, 0).percent, 0);
        assert!(!CourseProgress::new(CourseId::new(1), 0, 0).is_complete());
    }

    #[test]
    fn percentages_round_to_nearest() {
        assert_eq!(completion_percent(1, 3), 33);
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(1, 2), 50);
        assert_eq!(completion_percent(1, 8), 13);
        assert_eq!(completion_percent(3, 3), 100);
    }

    #[test]
    fn completed_is_clamped_to_total() {
        assert_eq!(completion_percent(5, 3), 100);
        let progress = CourseProgress::new(CourseId::new(2), 5, 3);
        assert_eq!(progress.completed_lessons, 3);
        assert!(progress.is_complete());
    }

    #[test]
    fn level_caps_at_twenty_five() {
        assert_eq!(learner_level(0), 0);
        assert_eq!(learner_level(7), 7);
        assert_eq!(learner_level(40), MAX_LEARNER_LEVEL);
    }

    #[test]
    fn counts_completed_courses() {
        let overview = [
            CourseProgress::new(CourseId::new(1), 2, 2),
            CourseProgress::new(CourseId::new(2), 1, 2),
            CourseProgress::new(CourseId::new(3), 0, 0),
        ];
        assert_eq!(completed_courses(&overview), 1);
    }

    #[test]
    fn engagement_counts_flags_per_lesson() {
        let lesson = LessonId::new(9);
        let mut a = LessonProgress::untouched(UserId::random(), lesson);
        a.set_flag(ProgressFlag::WatchedVideo, true, fixed_now());
        a.mark_complete(fixed_now());
        let mut b = LessonProgress::untouched(UserId::random(), lesson);
        b.set_flag(ProgressFlag::WatchedVideo, true, fixed_now());
        b.set_flag(ProgressFlag::PracticedOpen, true, fixed_now());
        let other = LessonProgress::untouched(UserId::random(), LessonId::new(10));

        let engagement = LessonEngagement::from_records(lesson, &[a, b, other]);
        assert_eq!(engagement.learners, 2);
        assert_eq!(engagement.completed, 1);
        assert_eq!(engagement.learners_with(ProgressFlag::WatchedVideo), 2);
        assert_eq!(engagement.learners_with(ProgressFlag::PracticedOpen), 1);
        assert_eq!(engagement.learners_with(ProgressFlag::ReadTranscript), 0);
        assert_eq!(engagement.completion_percent(), 50);
    }
}
