//! Demo catalog used by `lingua seed`. Ids are fixed so reseeding overwrites.

use lingua_core::model::{CourseId, LessonId, MaterialId, MaterialKind};
use services::{AppServices, CatalogServiceError, CourseDraft, LessonDraft};

struct DemoLesson {
    id: u64,
    title: &'static str,
    transcript: &'static str,
    materials: &'static [(u64, &'static str, MaterialKind, &'static str)],
}

struct DemoCourse {
    id: u64,
    title: &'static str,
    description: &'static str,
    instructor: &'static str,
    level: &'static str,
    duration: &'static str,
    lessons: &'static [DemoLesson],
}

const DEMO: &[DemoCourse] = &[
    DemoCourse {
        id: 1,
        title: "English Numbers 1-10",
        description: "Count, listen and say the numbers one to ten.",
        instructor: "James Wilson",
        level: "Beginner",
        duration: "45m",
        lessons: &[
            DemoLesson {
                id: 1,
                title: "One to five",
                transcript: "one, two, three, four, five",
                materials: &[(
                    1,
                    "Number chart",
                    MaterialKind::Pdf,
                    "https://cdn.lingua.test/numbers/chart-1-5.pdf",
                )],
            },
            DemoLesson {
                id: 2,
                title: "Six to ten",
                transcript: "six, seven, eight, nine, ten",
                materials: &[(
                    2,
                    "Listen and repeat",
                    MaterialKind::Audio,
                    "https://cdn.lingua.test/numbers/6-10.mp3",
                )],
            },
            DemoLesson {
                id: 3,
                title: "Counting practice",
                transcript: "one, two, three, four, five, six, seven, eight, nine, ten",
                materials: &[(
                    3,
                    "Counting worksheet",
                    MaterialKind::Worksheet,
                    "https://cdn.lingua.test/numbers/worksheet.pdf",
                )],
            },
        ],
    },
    DemoCourse {
        id: 2,
        title: "Spanish Conversation Basics",
        description: "Greetings and small talk for everyday situations.",
        instructor: "Maria Rodriguez",
        level: "Beginner",
        duration: "4h 30m",
        lessons: &[
            DemoLesson {
                id: 4,
                title: "Saludos",
                transcript: "hola, buenos días, buenas tardes",
                materials: &[],
            },
            DemoLesson {
                id: 5,
                title: "Presentarse",
                transcript: "me llamo Ana, mucho gusto",
                materials: &[],
            },
        ],
    },
];

/// What one seeding run wrote.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub courses: usize,
    pub lessons: usize,
    pub materials: usize,
}

/// Upsert the demo catalog.
///
/// # Errors
///
/// Returns `CatalogServiceError` if any write fails.
pub async fn seed_demo_catalog(services: &AppServices) -> Result<SeedReport, CatalogServiceError> {
    let catalog = services.catalog();
    let mut report = SeedReport::default();

    for course in DEMO {
        let course_id = CourseId::new(course.id);
        catalog
            .create_course(
                course_id,
                CourseDraft {
                    title: course.title.into(),
                    description: Some(course.description.into()),
                    instructor: Some(course.instructor.into()),
                    level: Some(course.level.into()),
                    duration: Some(course.duration.into()),
                    thumbnail: None,
                },
            )
            .await?;
        report.courses += 1;

        for (position, lesson) in (1u32..).zip(course.lessons) {
            let lesson_id = LessonId::new(lesson.id);
            catalog
                .add_lesson(
                    course_id,
                    lesson_id,
                    LessonDraft {
                        title: lesson.title.into(),
                        description: None,
                        position,
                        video_url: None,
                        transcript: Some(lesson.transcript.into()),
                    },
                )
                .await?;
            report.lessons += 1;

            for (id, title, kind, url) in lesson.materials {
                catalog
                    .add_material(
                        lesson_id,
                        MaterialId::new(*id),
                        Some((*title).into()),
                        kind.clone(),
                        (*url).into(),
                    )
                    .await?;
                report.materials += 1;
            }
        }
    }

    tracing::info!(
        courses = report.courses,
        lessons = report.lessons,
        materials = report.materials,
        "demo catalog seeded"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    use lingua_core::time::fixed_clock;

    #[tokio::test]
    async fn seeding_twice_is_idempotent() {
        let services = AppServices::in_memory(fixed_clock());
        let first = seed_demo_catalog(&services).await.unwrap();
        let second = seed_demo_catalog(&services).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.courses, 2);

        let courses = services.catalog().list_courses().await.unwrap();
        assert_eq!(courses.len(), 2);
        let outline = services
            .catalog()
            .course_outline(CourseId::new(1))
            .await
            .unwrap();
        assert_eq!(outline.lesson_count(), 3);
        assert_eq!(outline.lessons[0].lesson.title(), "One to five");
        assert_eq!(outline.lessons[2].materials.len(), 1);
    }
}
