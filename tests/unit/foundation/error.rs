use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        VisemixError::ordering("x")
            .to_string()
            .contains("ordering error:")
    );
    assert!(
        VisemixError::unresolved("x")
            .to_string()
            .contains("unresolved reference:")
    );
    assert!(
        VisemixError::marker("x")
            .to_string()
            .contains("marker resolution error:")
    );
    assert!(
        VisemixError::timing("x")
            .to_string()
            .contains("degenerate timing:")
    );
    assert!(
        VisemixError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn external_tool_carries_trimmed_stderr() {
    let err = VisemixError::external_tool("ffmpeg", "exit status: 1", b"  bad input\n");
    match &err {
        VisemixError::ExternalTool { tool, stderr, .. } => {
            assert_eq!(tool, "ffmpeg");
            assert_eq!(stderr, "bad input");
        }
        other => panic!("unexpected variant: {other:?}"),
    }
    assert!(err.to_string().starts_with("ffmpeg failed with exit status: 1"));
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = VisemixError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
