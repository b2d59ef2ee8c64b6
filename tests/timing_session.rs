use ktimer::{
    OutputFormat, TimerOptionsBuilder,
    converter::generators::ass_generator::generate_timings,
    layout::Layout,
    replay::{ScriptedHost, parse_script, run_script},
    timing::TimingSession,
};
use ktimer_core::SessionError;

const LYRICS: &str = "\
[Script Info]
Title: test
[Events]
Format: Layer, Start, End, Style, Name, MarginL, MarginR, MarginV, Effect, Text
Dialogue: 0,0:00:00.50,0:00:01.50,Romaji,,0,0,0,,intro
ka|ra|o|ke

sa|ku|ra
";

const SCRIPT: &str = "\
# 第一行
0.00 2.00 tap
0.50 2.50 tap
0.75 2.75 tap
1.00 3.00 tap
# 打满之后再按一次：结束该行并开始下一行
2.00 4.00 tap
2.25 4.25 tap
2.50 4.50 tap
3.50 5.50 end
";

fn options(format: OutputFormat) -> ktimer_core::TimerOptions {
    TimerOptionsBuilder::default()
        .time_shift(0.0)
        .output_format(format)
        .build()
        .unwrap()
}

fn replayed(format: OutputFormat, script: &str) -> (TimingSession, Vec<(usize, SessionError)>) {
    let layout = Layout::load_file_text(LYRICS, true).unwrap();
    let mut session = TimingSession::new(layout, options(format));
    let mut host = ScriptedHost::default();
    let steps = parse_script(script).unwrap();
    let rejected = run_script(&mut session, &mut host, &steps);
    (session, rejected)
}

#[test]
fn test_full_session_new_format() {
    let (session, rejected) = replayed(OutputFormat::New, SCRIPT);
    assert!(rejected.is_empty());
    assert!(session.is_finished());

    let output = generate_timings(session.layout(), session.options()).unwrap();
    insta::assert_snapshot!(output, @r"
    Dialogue: 0,0:00:02.00,0:00:04.00,Romaji,,0,0,0,,{\k50}ka{\k25}ra{\k25}o{\k100}ke
    Dialogue: 0,0:00:04.00,0:00:05.50,Romaji,,0,0,0,,{\k25}sa{\k25}ku{\k100}ra
    ");
}

#[test]
fn test_full_session_full_format_keeps_other_lines() {
    let (session, _) = replayed(OutputFormat::Full, SCRIPT);
    let output = generate_timings(session.layout(), session.options()).unwrap();
    let lines: Vec<&str> = output.split('\n').collect();

    assert_eq!(
        lines[0],
        "Dialogue: 0,0:00:00.50,0:00:01.50,Romaji,,0,0,0,,intro"
    );
    assert!(lines[1].ends_with("{\\k50}ka{\\k25}ra{\\k25}o{\\k100}ke"));
    assert_eq!(lines[2], "");
    assert!(lines[3].ends_with("{\\k25}sa{\\k25}ku{\\k100}ra"));
}

#[test]
fn test_rejected_commands_are_reported() {
    let script = "\
0 1 end
0 1 tap
0.5 1.5 end
0.5 1.5 undelete
";
    let (session, errors) = replayed(OutputFormat::New, script);
    assert_eq!(errors[0], (1, SessionError::EmptyRow));
    assert!(matches!(
        errors[1],
        (
            3,
            SessionError::IncompleteRow {
                taps: 1,
                expected: 4,
                ..
            }
        )
    ));
    assert_eq!(errors[2], (4, SessionError::UndeleteEmpty));
    assert_eq!(session.active_row(), Some(0));
}

#[test]
fn test_back_and_undelete_round_trip() {
    let script = format!("{SCRIPT}6 6 back\n6 6 undelete\n");
    let (session, rejected) = replayed(OutputFormat::New, &script);
    assert!(rejected.is_empty());
    assert!(session.is_finished());

    let (expected, _) = replayed(OutputFormat::New, SCRIPT);
    assert_eq!(session.layout(), expected.layout());
}
