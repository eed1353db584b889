use chrono::Utc;
use globalbridge::db::MemoryStore;
use globalbridge::error::*;
use globalbridge::models::*;
use globalbridge::program::Program;
use speculate2::speculate;

fn input(name: &str, id: &str, major: &str, language: &str, grade: i64) -> RegisterParticipantInput {
    RegisterParticipantInput {
        name: name.to_string(),
        student_id: id.to_string(),
        major: major.to_string(),
        language: language.to_string(),
        grade,
    }
}

fn mentor(program: &mut Program<MemoryStore>, name: &str, id: &str) -> Participant {
    program
        .register(input(name, id, "CS", "Korean", 1))
        .expect("Failed to register mentor")
}

fn mentee(program: &mut Program<MemoryStore>, name: &str, id: &str) -> Participant {
    program
        .register(input(name, id, "Econ", "English", 1))
        .expect("Failed to register mentee")
}

fn ids(participants: &[&Participant]) -> Vec<String> {
    participants.iter().map(|p| p.student_id.clone()).collect()
}

fn keys(pairs: &[Pair]) -> Vec<String> {
    pairs.iter().map(Pair::key).collect()
}

speculate! {
    before {
        let store = MemoryStore::new();
        let mut program = Program::open(store.clone()).expect("Failed to open program");
    }

    describe "register" {
        it "places each participant in exactly one view by language" {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");
            program.register(input("Park", "1003", "Math", "KOREAN", 3)).expect("Failed");
            program.register(input("Smith", "2004", "Art", "english", 4)).expect("Failed");

            assert_eq!(ids(&program.mentors()), vec!["1001", "1003"]);
            assert_eq!(ids(&program.mentees()), vec!["2002", "2004"]);
            assert_eq!(program.participants().len(), 4);
        }

        it "saves after every registration" {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");

            assert_eq!(store.save_count(), 2);
            assert_eq!(store.snapshot().expect("No snapshot").participants().len(), 2);
        }

        it "rejects invalid input without registering anything" {
            let cases = [
                input("", "1001", "CS", "Korean", 1),
                input("Kim", "", "CS", "Korean", 1),
                input("Kim", "1001", "", "Korean", 1),
                input("Kim", "1001", "CS", "French", 1),
                input("Kim", "1001", "CS", "Korean", 0),
                input("Kim", "1001", "CS", "Korean", 5),
            ];

            for case in cases {
                let err = program.register(case).unwrap_err();
                assert!(matches!(err, ProgramError::Validation(_)), "unexpected {:?}", err);
            }

            assert!(program.participants().is_empty());
            assert_eq!(store.save_count(), 0);
        }

        it "rejects a duplicate student id" {
            mentor(&mut program, "Kim", "1001");
            let err = program.register(input("Other", "1001", "Art", "English", 2)).unwrap_err();

            assert!(matches!(
                err,
                ProgramError::Validation(ValidationError::DuplicateStudentId(ref id)) if id == "1001"
            ));
            assert_eq!(program.participants().len(), 1);
        }
    }

    describe "auto_match" {
        it "pairs min(m, n) participants in registration order" {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");
            mentor(&mut program, "Park", "1003");
            mentor(&mut program, "Choi", "1005");
            mentee(&mut program, "Smith", "2004");

            let pairs = program.auto_match().expect("Failed to auto-match");

            assert_eq!(keys(&pairs), vec!["1001-2002", "1003-2004"]);
            assert!(program.state().pair_of("1005").is_none());
        }

        it "leaves surplus mentees unmatched" {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");
            mentee(&mut program, "Smith", "2004");

            let pairs = program.auto_match().expect("Failed");

            assert_eq!(keys(&pairs), vec!["1001-2002"]);
            assert!(program.state().pair_of("2004").is_none());
        }

        it "is idempotent when nobody new registered" {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");
            program.auto_match().expect("Failed");
            let saves = store.save_count();

            let again = program.auto_match().expect("Failed");

            assert!(again.is_empty());
            assert_eq!(program.state().pair_count(), 1);
            assert_eq!(store.save_count(), saves);
        }

        it "only matches participants registered since the last run" {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");
            mentor(&mut program, "Park", "1003");
            program.auto_match().expect("Failed");

            mentee(&mut program, "Smith", "2004");
            let pairs = program.auto_match().expect("Failed");

            assert_eq!(keys(&pairs), vec!["1003-2004"]);
            assert_eq!(program.state().pair_count(), 2);
        }
    }

    describe "manual_match" {
        before {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");
            mentor(&mut program, "Park", "1003");
            mentee(&mut program, "Smith", "2004");
        }

        it "pairs the chosen participants" {
            let pair = program.manual_match(Some("1003"), Some("2002")).expect("Failed");

            assert_eq!(pair.key(), "1003-2002");
            assert_eq!(program.pair("1003-2002"), Some(&pair));
        }

        it "fails with a role constraint error when the mentor is not a mentor" {
            let err = program.manual_match(Some("2004"), Some("2002")).unwrap_err();
            assert!(matches!(
                err,
                ProgramError::RoleConstraint(RoleConstraintError::MentorNotKorean { .. })
            ));
            assert_eq!(program.state().pair_count(), 0);
        }

        it "fails with a role constraint error when the mentee is a mentor" {
            let err = program.manual_match(Some("1001"), Some("1003")).unwrap_err();
            assert!(matches!(
                err,
                ProgramError::RoleConstraint(RoleConstraintError::MenteeNotEnglish { .. })
            ));
        }

        it "fails with a selection error when a side is missing or unknown" {
            assert!(matches!(
                program.manual_match(None, Some("2002")).unwrap_err(),
                ProgramError::Selection(SelectionError::MentorNotSelected)
            ));
            assert!(matches!(
                program.manual_match(Some("1001"), None).unwrap_err(),
                ProgramError::Selection(SelectionError::MenteeNotSelected)
            ));
            assert!(matches!(
                program.manual_match(Some("9999"), Some("2002")).unwrap_err(),
                ProgramError::Selection(SelectionError::UnknownParticipant(_))
            ));
        }

        it "returns the existing pair when matched again" {
            program.manual_match(Some("1001"), Some("2002")).expect("Failed");
            let saves = store.save_count();

            let again = program.manual_match(Some("1001"), Some("2002")).expect("Failed");

            assert_eq!(again.key(), "1001-2002");
            assert_eq!(program.state().pair_count(), 1);
            assert_eq!(store.save_count(), saves);
        }

        it "refuses to put a participant into a second pair" {
            program.manual_match(Some("1001"), Some("2002")).expect("Failed");

            let err = program.manual_match(Some("1001"), Some("2004")).unwrap_err();

            assert!(matches!(
                err,
                ProgramError::AlreadyMatched { ref student_id, ref pair_key }
                    if student_id == "1001" && pair_key == "1001-2002"
            ));
            assert_eq!(program.state().pair_count(), 1);
        }

        it "allows rematching after unmatch" {
            program.manual_match(Some("1001"), Some("2002")).expect("Failed");
            program.record_activity("1001-2002", RecordActivityInput {
                content: "Coffee chat".to_string(),
                location: "Library".to_string(),
            }).expect("Failed");

            let removed = program.unmatch("1001-2002").expect("Failed to unmatch");
            assert_eq!(removed.key(), "1001-2002");
            assert!(program.activities_for("1001-2002").is_empty());

            program.manual_match(Some("1001"), Some("2004")).expect("Failed");
            assert!(program.pair("1001-2004").is_some());
        }

        it "fails to unmatch an unknown pair" {
            assert!(matches!(
                program.unmatch("1-2").unwrap_err(),
                ProgramError::UnknownPair(_)
            ));
        }
    }

    describe "activities" {
        before {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");
            program.auto_match().expect("Failed to auto-match");
        }

        it "records an activity for an existing pair" {
            let activity = program.record_activity("1001-2002", RecordActivityInput {
                content: "Coffee chat".to_string(),
                location: "Library".to_string(),
            }).expect("Failed to record");

            let recorded = program.activities_for("1001-2002");
            assert_eq!(recorded.len(), 1);
            assert_eq!(recorded[0], activity);
            assert!(!recorded[0].completed);
        }

        it "keeps insertion order" {
            let later = Utc::now();
            let earlier = later - chrono::Duration::days(3);
            program.add_activity("1001-2002", Activity::new(later, "Second", "Cafe").unwrap()).expect("Failed");
            program.add_activity("1001-2002", Activity::new(earlier, "First", "Gym").unwrap()).expect("Failed");

            let contents: Vec<&str> = program
                .activities_for("1001-2002")
                .iter()
                .map(|a| a.content.as_str())
                .collect();
            assert_eq!(contents, vec!["Second", "First"]);
        }

        it "rejects an unknown pair key without touching the ledger" {
            let saves = store.save_count();
            let err = program
                .add_activity("1001-9999", Activity::new(Utc::now(), "Chat", "Cafe").unwrap())
                .unwrap_err();

            assert!(matches!(err, ProgramError::UnknownPair(ref key) if key == "1001-9999"));
            assert!(program.activities_for("1001-9999").is_empty());
            assert!(program.state().ledger().next().is_none());
            assert_eq!(store.save_count(), saves);
        }

        it "rejects blank content" {
            let err = program.record_activity("1001-2002", RecordActivityInput {
                content: " ".to_string(),
                location: "Library".to_string(),
            }).unwrap_err();
            assert!(matches!(err, ProgramError::Validation(ValidationError::EmptyField("content"))));
        }

        it "rejects multi-line content and an @ in the location" {
            let saves = store.save_count();
            let multi_line = program.record_activity("1001-2002", RecordActivityInput {
                content: "Coffee\nchat".to_string(),
                location: "Library".to_string(),
            }).unwrap_err();
            let marker = program.record_activity("1001-2002", RecordActivityInput {
                content: "Chat".to_string(),
                location: "Cafe @ Gate".to_string(),
            }).unwrap_err();

            assert!(matches!(
                multi_line,
                ProgramError::Validation(ValidationError::ControlCharacter { field: "content" })
            ));
            assert!(matches!(
                marker,
                ProgramError::Validation(ValidationError::LocationMarker(_))
            ));
            assert!(program.activities_for("1001-2002").is_empty());
            assert_eq!(store.save_count(), saves);
        }

        it "returns an empty list for a pair without activities" {
            assert!(program.activities_for("1001-2002").is_empty());
        }

        it "marks an activity completed and back" {
            program.record_activity("1001-2002", RecordActivityInput {
                content: "Coffee chat".to_string(),
                location: "Library".to_string(),
            }).expect("Failed");

            let done = program.set_activity_completed("1001-2002", 0, true).expect("Failed");
            assert!(done.completed);
            assert!(program.activities_for("1001-2002")[0].completed);

            program.set_activity_completed("1001-2002", 0, false).expect("Failed");
            assert!(!program.activities_for("1001-2002")[0].completed);
        }

        it "reports a missing activity index" {
            assert!(matches!(
                program.set_activity_completed("1001-2002", 3, true).unwrap_err(),
                ProgramError::ActivityNotFound { index: 3, .. }
            ));
            assert!(matches!(
                program.set_activity_completed("9-9", 0, true).unwrap_err(),
                ProgramError::UnknownPair(_)
            ));
        }
    }

    describe "save failures" {
        it "roll back a match" {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");

            store.fail_next_save();
            let err = program.auto_match().unwrap_err();

            assert!(matches!(err, ProgramError::Persistence(_)));
            assert_eq!(program.state().pair_count(), 0);
            assert_eq!(store.snapshot().expect("No snapshot").pair_count(), 0);
        }

        it "roll back an activity" {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");
            program.auto_match().expect("Failed");

            store.fail_next_save();
            let result = program.record_activity("1001-2002", RecordActivityInput {
                content: "Coffee chat".to_string(),
                location: "Library".to_string(),
            });

            assert!(result.is_err());
            assert!(program.activities_for("1001-2002").is_empty());
        }
    }

    describe "open" {
        it "starts empty when nothing was saved" {
            assert!(program.state().is_empty());
        }

        it "restores the last committed state" {
            mentor(&mut program, "Kim", "1001");
            mentee(&mut program, "Lee", "2002");
            program.auto_match().expect("Failed");

            let reopened = Program::open(store.clone()).expect("Failed to reopen");

            assert_eq!(reopened.state(), program.state());
        }
    }

    describe "example scenario" {
        it "registers, matches and records a coffee chat" {
            program.register(input("Kim", "1001", "CS", "Korean", 2)).expect("Failed");
            program.register(input("Lee", "2002", "Econ", "English", 3)).expect("Failed");

            let pairs = program.auto_match().expect("Failed");
            assert_eq!(keys(&pairs), vec!["1001-2002"]);

            program.record_activity("1001-2002", RecordActivityInput {
                content: "Coffee chat".to_string(),
                location: "Library".to_string(),
            }).expect("Failed");

            let activities = program.activities_for("1001-2002");
            assert_eq!(activities.len(), 1);
            assert_eq!(activities[0].content, "Coffee chat");
            assert_eq!(activities[0].location, "Library");
            assert!(!activities[0].completed);
        }
    }
}
