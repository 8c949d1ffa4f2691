//! The fixed 26-week strength program.
//!
//! The program is generated, never loaded: every week carries the same three
//! sessions, each running the whole exercise vocabulary in order. Loads and
//! reps come from the exercise's position in the vocabulary. Deload weeks
//! scale every prescribed weight by [`DELOAD_FACTOR`].

use crate::config::ProgramConfig;
use crate::types::*;
use once_cell::sync::Lazy;
use std::collections::BTreeMap;

/// Number of weeks in the program
pub const PROGRAM_WEEKS: u32 = 26;

/// Weeks run at reduced load
pub const DELOAD_WEEKS: [u32; 5] = [6, 12, 18, 24, 26];

/// Load multiplier applied on deload weeks
pub const DELOAD_FACTOR: f64 = 0.6;

/// Exercises above this vocabulary index use the isolation template
const ISOLATION_FROM: usize = 10;

const SESSION_MINUTES: u32 = 70;
const TEMPO: &str = "2-0-1";

/// Exercise vocabulary, in prescribed execution order
pub const EXERCISE_ORDER: [&str; 22] = [
    "Trap Bar Deadlift",
    "Goblet Squat",
    "Leg Press (heavy)",
    "Leg Press (light)",
    "Lat Pulldown (wide grip)",
    "Landmine Press",
    "Rowing Machine (wide)",
    "Rowing Machine (close)",
    "Spider Curl",
    "Incline Curl",
    "EZ Bar Curl",
    "Dumbbell Press",
    "Cable Fly",
    "Dumbbell Fly",
    "Leg Curl",
    "Leg Extension",
    "Triceps Extension",
    "Overhead Extension",
    "Lateral Raises",
    "Face Pull",
    "Wrist Curl",
    "Hammer Curl (home)",
];

/// An exercise appended to one day's base list
#[derive(Clone, Debug)]
pub struct DayAddition {
    pub name: &'static str,
    pub notes: &'static str,
    pub sets: Vec<SetPrescription>,
}

/// Declarative composition of one training day
#[derive(Clone, Debug)]
pub struct DayPlan {
    pub day: Day,
    pub description: &'static str,
    pub additions: Vec<DayAddition>,
}

/// The three training days with their day-specific additions
pub fn day_plans() -> Vec<DayPlan> {
    vec![
        DayPlan {
            day: Day::Sunday,
            description: "back, heavy legs, arms",
            additions: vec![],
        },
        DayPlan {
            day: Day::Tuesday,
            description: "chest, shoulders, triceps",
            additions: vec![DayAddition {
                name: "Hammer Curl (home)",
                notes: "Home session (Tuesday).",
                sets: vec![SetPrescription {
                    series_index: 1,
                    target_reps: 12,
                    rest_seconds: 60,
                    tempo: TEMPO.into(),
                    target_rpe: 7.0,
                    target_weight_kg: 0,
                }],
            }],
        },
        DayPlan {
            day: Day::Friday,
            description: "back, light legs, arms, shoulders",
            additions: vec![],
        },
    ]
}

/// Whether a week runs at reduced load
pub fn is_deload_week(week_number: u32) -> bool {
    DELOAD_WEEKS.contains(&week_number)
}

/// Set template for the exercise at `index` in the vocabulary
pub fn default_sets(index: usize) -> Vec<SetPrescription> {
    let i = index as f64;
    let set = |series_index, target_reps, rest_seconds, target_rpe, weight: f64| SetPrescription {
        series_index,
        target_reps,
        rest_seconds,
        tempo: TEMPO.into(),
        target_rpe,
        target_weight_kg: weight.round() as u32,
    };

    if index > ISOLATION_FROM {
        // Isolation tail: lighter, more reps
        vec![
            set(1, 12, 90, 7.0, 8.0 + i),
            set(2, 10, 90, 7.5, 9.0 + i),
            set(3, 8, 90, 8.0, 10.0 + i),
        ]
    } else {
        vec![
            set(1, 5, 120, 7.0, 20.0 + i * 1.8),
            set(2, 5, 120, 7.5, 22.0 + i * 1.8),
            set(3, 5, 120, 8.0, 24.0 + i * 1.8),
        ]
    }
}

fn scale(value: u32) -> u32 {
    (value as f64 * DELOAD_FACTOR).round() as u32
}

/// The generated program
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    weeks: Vec<ProgramWeek>,
}

/// Cached program for the default options - generated once per process
static STANDARD_PROGRAM: Lazy<Program> = Lazy::new(|| Program::generate(&ProgramConfig::default()));

impl Program {
    /// Program for the default options, generated once and shared
    pub fn standard() -> &'static Program {
        &STANDARD_PROGRAM
    }

    /// Generate the full program for the given options
    ///
    /// Pure: the same options always produce the same program.
    pub fn generate(options: &ProgramConfig) -> Program {
        let plans = day_plans();
        let weeks = (1..=PROGRAM_WEEKS)
            .map(|week_number| generate_week(week_number, &plans, options))
            .collect();
        Program { weeks }
    }

    pub fn weeks(&self) -> &[ProgramWeek] {
        &self.weeks
    }

    pub fn week(&self, week_number: u32) -> Option<&ProgramWeek> {
        week_number
            .checked_sub(1)
            .and_then(|idx| self.weeks.get(idx as usize))
    }

    pub fn into_weeks(self) -> Vec<ProgramWeek> {
        self.weeks
    }

    /// Check program integrity, returning every problem found
    pub fn validate(&self) -> Vec<String> {
        validate_weeks(&self.weeks)
    }
}

/// Weeks of the standard program, for defaulting session state
pub fn standard_weeks() -> Vec<ProgramWeek> {
    Program::standard().weeks().to_vec()
}

fn generate_week(week_number: u32, plans: &[DayPlan], options: &ProgramConfig) -> ProgramWeek {
    let deload = is_deload_week(week_number);
    let sessions = plans
        .iter()
        .map(|plan| (plan.day, build_session(plan, deload, options)))
        .collect::<BTreeMap<_, _>>();

    ProgramWeek {
        week_number,
        is_deload: deload,
        sessions,
    }
}

fn build_session(plan: &DayPlan, deload: bool, options: &ProgramConfig) -> Session {
    let mut exercises: Vec<Exercise> = EXERCISE_ORDER
        .iter()
        .enumerate()
        .map(|(idx, name)| Exercise {
            name: (*name).into(),
            mandatory: true,
            notes: String::new(),
            sets: default_sets(idx),
        })
        .collect();

    for addition in &plan.additions {
        // Already part of the base vocabulary: keep the base prescription
        if exercises.iter().any(|e| e.name == addition.name) {
            continue;
        }
        exercises.push(Exercise {
            name: addition.name.into(),
            mandatory: true,
            notes: addition.notes.into(),
            sets: addition.sets.clone(),
        });
    }

    if deload {
        for set in exercises.iter_mut().flat_map(|e| e.sets.iter_mut()) {
            set.target_weight_kg = scale(set.target_weight_kg);
            if options.scale_rest_on_deload {
                set.rest_seconds = scale(set.rest_seconds);
            }
        }
    }

    Session {
        day: plan.day,
        description: plan.description.into(),
        duration_minutes: SESSION_MINUTES,
        exercises,
    }
}

/// Integrity checks shared by the generator and by loaded program snapshots
pub fn validate_weeks(weeks: &[ProgramWeek]) -> Vec<String> {
    let mut errors = Vec::new();

    if weeks.len() != PROGRAM_WEEKS as usize {
        errors.push(format!(
            "Program has {} weeks, expected {}",
            weeks.len(),
            PROGRAM_WEEKS
        ));
    }

    for (idx, week) in weeks.iter().enumerate() {
        let expected = idx as u32 + 1;
        if week.week_number != expected {
            errors.push(format!(
                "Week at position {} is numbered {}",
                expected, week.week_number
            ));
        }
        if week.is_deload != is_deload_week(week.week_number) {
            errors.push(format!(
                "Week {} has deload flag {}",
                week.week_number, week.is_deload
            ));
        }

        for day in Day::ALL {
            let Some(session) = week.session(day) else {
                errors.push(format!("Week {} is missing its {} session", week.week_number, day));
                continue;
            };

            let names: Vec<&str> = session
                .exercises
                .iter()
                .take(EXERCISE_ORDER.len())
                .map(|e| e.name.as_str())
                .collect();
            if names != EXERCISE_ORDER {
                errors.push(format!(
                    "Week {} {} does not follow the exercise order",
                    week.week_number, day
                ));
            }

            for exercise in &session.exercises {
                let contiguous = exercise
                    .sets
                    .iter()
                    .enumerate()
                    .all(|(i, s)| s.series_index == i as u32 + 1);
                if exercise.sets.is_empty() || !contiguous {
                    errors.push(format!(
                        "Week {} {} '{}' has non-contiguous series",
                        week.week_number, day, exercise.name
                    ));
                }
            }
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_program_has_26_weeks() {
        let program = Program::standard();
        assert_eq!(program.weeks().len(), 26);
        for (idx, week) in program.weeks().iter().enumerate() {
            assert_eq!(week.week_number, idx as u32 + 1);
        }
    }

    #[test]
    fn test_deload_flags() {
        let program = Program::standard();
        for week in 1..=PROGRAM_WEEKS {
            let expected = [6, 12, 18, 24, 26].contains(&week);
            assert_eq!(program.week(week).unwrap().is_deload, expected, "week {}", week);
        }
        assert!(program.week(0).is_none());
        assert!(program.week(27).is_none());
    }

    #[test]
    fn test_sessions_follow_vocabulary_order() {
        let program = Program::standard();
        for week in program.weeks() {
            assert_eq!(week.sessions.len(), 3);
            for day in Day::ALL {
                let session = week.session(day).unwrap();
                let names: Vec<&str> = session.exercises.iter().map(|e| e.name.as_str()).collect();
                assert_eq!(&names[..22], &EXERCISE_ORDER[..]);
                // The home hammer curl is already the vocabulary's last entry
                assert_eq!(session.exercises.len(), 22);
                assert_eq!(session.duration_minutes, 70);
            }
        }
    }

    #[test]
    fn test_templates() {
        let heavy = default_sets(0);
        assert_eq!(heavy.len(), 3);
        assert_eq!(heavy[0].target_reps, 5);
        assert_eq!(heavy[0].rest_seconds, 120);
        assert_eq!(heavy[0].target_weight_kg, 20);
        assert_eq!(heavy[2].target_weight_kg, 24);

        // index 10 is still heavy: round(20 + 18) = 38
        assert_eq!(default_sets(10)[0].target_weight_kg, 38);
        assert_eq!(default_sets(10)[0].target_reps, 5);

        let isolation = default_sets(11);
        assert_eq!(
            isolation.iter().map(|s| s.target_reps).collect::<Vec<_>>(),
            vec![12, 10, 8]
        );
        assert_eq!(isolation[0].rest_seconds, 90);
        assert_eq!(isolation[0].target_weight_kg, 19);
        assert_eq!(isolation[1].target_rpe, 7.5);
    }

    #[test]
    fn test_series_contiguous() {
        for week in Program::standard().weeks() {
            for session in week.sessions.values() {
                for exercise in &session.exercises {
                    for (i, set) in exercise.sets.iter().enumerate() {
                        assert_eq!(set.series_index, i as u32 + 1);
                    }
                }
            }
        }
    }

    #[test]
    fn test_deload_week_6_weights() {
        let program = Program::standard();
        let normal = program.week(5).unwrap();
        let deload = program.week(6).unwrap();

        for day in Day::ALL {
            let a = normal.session(day).unwrap();
            let b = deload.session(day).unwrap();
            for (ea, eb) in a.exercises.iter().zip(&b.exercises) {
                for (sa, sb) in ea.sets.iter().zip(&eb.sets) {
                    let expected = (sa.target_weight_kg as f64 * 0.6).round() as u32;
                    assert_eq!(sb.target_weight_kg, expected);
                    // Rest unchanged by default
                    assert_eq!(sb.rest_seconds, sa.rest_seconds);
                }
            }
        }
    }

    #[test]
    fn test_rest_scaling_is_configurable() {
        let program = Program::generate(&ProgramConfig {
            scale_rest_on_deload: true,
        });
        let set = &program.week(12).unwrap().session(Day::Sunday).unwrap().exercises[0].sets[0];
        assert_eq!(set.rest_seconds, 72);
        let set = &program.week(11).unwrap().session(Day::Sunday).unwrap().exercises[0].sets[0];
        assert_eq!(set.rest_seconds, 120);
    }

    #[test]
    fn test_generation_is_deterministic() {
        let a = Program::generate(&ProgramConfig::default());
        let b = Program::generate(&ProgramConfig::default());
        assert_eq!(a, b);
        assert_eq!(&a, Program::standard());
    }

    #[test]
    fn test_addition_appended_when_not_in_vocabulary() {
        let plan = DayPlan {
            day: Day::Tuesday,
            description: "test",
            additions: vec![DayAddition {
                name: "Band Pull-Apart",
                notes: "extra",
                sets: default_sets(0),
            }],
        };
        let session = build_session(&plan, false, &ProgramConfig::default());
        assert_eq!(session.exercises.len(), 23);
        assert_eq!(session.exercises[22].name, "Band Pull-Apart");
        assert_eq!(session.exercises[22].notes, "extra");
    }

    #[test]
    fn test_validate_clean_program() {
        assert!(Program::standard().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_problems() {
        let mut weeks = standard_weeks();
        weeks[5].is_deload = false;
        weeks.pop();
        let errors = validate_weeks(&weeks);
        assert!(errors.iter().any(|e| e.contains("25 weeks")));
        assert!(errors.iter().any(|e| e.contains("Week 6 has deload flag")));
    }
}
