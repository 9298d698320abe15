use gazel::app::{parse_command, Command};
use gazel::config::Config;
use gazel::types::{ImageRef, Reaction, SendRequest};

#[test]
fn test_config_validation_rejects_bare_host() {
    let config = Config {
        api_url: "localhost:8000".to_string(),
        log_file: None,
    };

    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_allows_local_endpoint() {
    let config = Config {
        api_url: "http://localhost:8000".to_string(),
        log_file: None,
    };

    assert!(config.validate().is_ok());
}

#[test]
fn test_command_grammar_covers_image_attachment_paths() {
    assert_eq!(
        parse_command("/url https://x/dog.jpg describe this").expect("url command"),
        Command::Send(SendRequest::with_image(
            "describe this",
            ImageRef::Url("https://x/dog.jpg".to_string()),
        ))
    );

    assert_eq!(
        parse_command("/image ./dog.jpg describe this").expect("image command"),
        Command::SendImageFile {
            path: "./dog.jpg".to_string(),
            prompt: "describe this".to_string(),
        }
    );
}

#[test]
fn test_command_grammar_covers_transcript_operations() {
    assert_eq!(parse_command("/delete 2").expect("delete"), Command::Delete(2));
    assert_eq!(
        parse_command("/like 3").expect("like"),
        Command::React {
            index: 3,
            reaction: Reaction::Like,
        }
    );
    assert_eq!(
        parse_command("/regen").expect("regen"),
        Command::Regenerate(None)
    );
}
