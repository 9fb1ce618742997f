use std::path::PathBuf;

use anyhow::{Context, Result};
use chappy_notes::config::NotesConfig;
use chappy_notes::tools::{self, TOOL_NAMES};
use chappy_notes::{ConversationTurn, NotesError, NotesService, Role};
use clap::{Parser, Subcommand};
use serde_json::{Map, Value, json};

/// chappy-notes - note storage with tag inference and ranked search
#[derive(Parser)]
#[command(name = "chappy-notes")]
#[command(about = "Store, search and draft notes from conversations")]
#[command(version)]
struct Cli {
    /// Storage root (overrides CHAPPY_NOTES_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// List notes, most recently updated first
    List(ListCommand),
    /// Search notes by text and tags
    Search(SearchCommand),
    /// Show one note with its rendered markdown
    Show(IdCommand),
    /// Create a note
    Create(CreateCommand),
    /// Update fields of a note
    Update(UpdateCommand),
    /// Draft a note from conversation turns without saving it
    Draft(DraftCommand),
    /// Open a stored note as an editor draft
    EditDraft(IdCommand),
    /// Invoke a tool by name with JSON arguments
    Call(CallCommand),
}

#[derive(Parser)]
struct ListCommand {
    #[arg(short, long)]
    limit: Option<usize>,

    #[arg(short, long)]
    offset: Option<usize>,

    /// Comma-separated tags; notes must carry all of them
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,
}

#[derive(Parser)]
struct SearchCommand {
    /// Text to look for in titles, summaries and bodies
    #[arg(value_name = "QUERY")]
    query: Option<String>,

    #[command(flatten)]
    page: ListCommand,
}

#[derive(Parser)]
struct IdCommand {
    #[arg(value_name = "ID")]
    id: String,
}

#[derive(Parser)]
struct CreateCommand {
    #[arg(value_name = "TITLE")]
    title: String,

    #[arg(value_name = "CONTENT")]
    content: String,

    /// Comma-separated tags; inferred from the text when omitted
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,

    #[arg(short, long)]
    summary: Option<String>,

    /// Conversation the note came from
    #[arg(long, value_name = "ID")]
    conversation: Option<String>,
}

#[derive(Parser)]
struct UpdateCommand {
    #[arg(value_name = "ID")]
    id: String,

    #[arg(long)]
    title: Option<String>,

    #[arg(long)]
    content: Option<String>,

    /// Comma-separated tags replacing the current ones
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,

    #[arg(short, long)]
    summary: Option<String>,

    #[arg(long, value_name = "ID")]
    conversation: Option<String>,
}

#[derive(Parser)]
struct DraftCommand {
    /// A turn as ROLE:TEXT (role is user, assistant or system); repeat in order
    #[arg(long = "turn", value_name = "ROLE:TEXT", value_parser = parse_turn)]
    turns: Vec<ConversationTurn>,

    #[arg(long)]
    topic: Option<String>,

    /// Comma-separated tags placed first in the suggestions
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,

    #[arg(long)]
    title_hint: Option<String>,

    #[arg(long)]
    summary_hint: Option<String>,

    #[arg(long, value_name = "ID")]
    conversation: Option<String>,
}

#[derive(Parser)]
struct CallCommand {
    /// Tool name, e.g. notes.search
    #[arg(value_name = "TOOL", value_parser = clap::builder::PossibleValuesParser::new(TOOL_NAMES))]
    tool: String,

    /// JSON object with the tool arguments
    #[arg(value_name = "JSON", default_value = "{}")]
    arguments: String,
}

fn main() {
    dotenvy::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let (tool, arguments) = tool_call(cli.command)?;

    let config = NotesConfig::resolve(cli.data_dir)?;
    let service = NotesService::new(config.open_store()?);

    let response =
        tools::call(&service, &tool, arguments).with_context(|| format!("{tool} failed"))?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are rejected inputs. Internal errors include I/O failures and
/// corrupt index files.
fn is_user_error(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| cause.downcast_ref::<NotesError>().is_some_and(NotesError::is_validation))
}

/// Translates a subcommand into a tool name and its JSON arguments.
fn tool_call(command: Commands) -> Result<(String, Value)> {
    let (tool, arguments) = match command {
        Commands::List(cmd) => ("notes.list", page_arguments(&cmd)),
        Commands::Search(cmd) => {
            let mut arguments = page_arguments(&cmd.page);
            insert_opt(&mut arguments, "query", cmd.query);
            ("notes.search", arguments)
        }
        Commands::Show(cmd) => ("notes.get", object(json!({ "id": cmd.id }))),
        Commands::Create(cmd) => {
            let mut arguments = object(json!({ "title": cmd.title, "content": cmd.content }));
            insert_opt(&mut arguments, "tags", cmd.tags.as_deref().map(parse_tags));
            insert_opt(&mut arguments, "summary", cmd.summary);
            insert_opt(&mut arguments, "sourceConversationId", cmd.conversation);
            ("notes.create", arguments)
        }
        Commands::Update(cmd) => {
            let mut arguments = object(json!({ "id": cmd.id }));
            insert_opt(&mut arguments, "title", cmd.title);
            insert_opt(&mut arguments, "content", cmd.content);
            insert_opt(&mut arguments, "tags", cmd.tags.as_deref().map(parse_tags));
            insert_opt(&mut arguments, "summary", cmd.summary);
            insert_opt(&mut arguments, "sourceConversationId", cmd.conversation);
            ("notes.update", arguments)
        }
        Commands::Draft(cmd) => {
            let mut context = object(json!({ "turns": cmd.turns }));
            insert_opt(&mut context, "topic", cmd.topic);
            let mut arguments = Map::new();
            arguments.insert("conversationContext".to_string(), Value::Object(context));
            insert_opt(&mut arguments, "tagHints", cmd.tags.as_deref().map(parse_tags));
            insert_opt(&mut arguments, "titleHint", cmd.title_hint);
            insert_opt(&mut arguments, "summaryHint", cmd.summary_hint);
            insert_opt(&mut arguments, "sourceConversationId", cmd.conversation);
            ("notes.generateDraft", arguments)
        }
        Commands::EditDraft(cmd) => ("notes.editDraft", object(json!({ "id": cmd.id }))),
        Commands::Call(cmd) => {
            let arguments: Value = serde_json::from_str(&cmd.arguments)
                .map_err(|e| NotesError::Validation(format!("arguments are not valid JSON: {e}")))?;
            return Ok((cmd.tool, arguments));
        }
    };

    Ok((tool.to_string(), Value::Object(arguments)))
}

fn page_arguments(cmd: &ListCommand) -> Map<String, Value> {
    let mut arguments = Map::new();
    insert_opt(&mut arguments, "limit", cmd.limit);
    insert_opt(&mut arguments, "offset", cmd.offset);
    insert_opt(&mut arguments, "tags", cmd.tags.as_deref().map(parse_tags));
    arguments
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn insert_opt<T: Into<Value>>(arguments: &mut Map<String, Value>, key: &str, value: Option<T>) {
    if let Some(value) = value {
        arguments.insert(key.to_string(), value.into());
    }
}

/// Parses a `ROLE:TEXT` turn argument.
fn parse_turn(input: &str) -> Result<ConversationTurn, String> {
    let (role, text) = input
        .split_once(':')
        .ok_or_else(|| format!("expected ROLE:TEXT, got '{input}'"))?;

    let role = match role.trim().to_lowercase().as_str() {
        "user" => Role::User,
        "assistant" | "ai" => Role::Assistant,
        "system" => Role::System,
        other => return Err(format!("unknown role '{other}'")),
    };

    Ok(ConversationTurn::new(role, text.trim()))
}

/// Parses comma-separated tags from a string.
///
/// Splits on commas, trims whitespace from each tag, and filters out empty strings.
fn parse_tags(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tags_with_normal_input() {
        let result = parse_tags("rust,learning");
        assert_eq!(result, vec!["rust", "learning"]);
    }

    #[test]
    fn parse_tags_with_whitespace() {
        let result = parse_tags(" rust , learning ");
        assert_eq!(result, vec!["rust", "learning"]);
    }

    #[test]
    fn parse_tags_with_empty_elements() {
        let result = parse_tags("rust,,learning,");
        assert_eq!(result, vec!["rust", "learning"]);
    }

    #[test]
    fn parse_tags_only_whitespace() {
        let result = parse_tags("  ,  ,  ");
        assert!(result.is_empty());
    }

    #[test]
    fn parse_turn_reads_role_and_text() {
        let turn = parse_turn("Assistant: Sure, here it is: done").unwrap();
        assert_eq!(turn.role, Role::Assistant);
        assert_eq!(turn.content, "Sure, here it is: done");

        assert_eq!(parse_turn("ai:hi").unwrap().role, Role::Assistant);
        assert!(parse_turn("no separator").is_err());
        assert!(parse_turn("robot: beep").is_err());
    }

    #[test]
    fn create_command_maps_to_create_tool() {
        let cli = Cli::parse_from([
            "chappy-notes",
            "create",
            "Title",
            "Body",
            "--tags",
            "rust, async",
            "--conversation",
            "conv-1",
        ]);

        let (tool, arguments) = tool_call(cli.command).unwrap();

        assert_eq!(tool, "notes.create");
        assert_eq!(
            arguments,
            json!({
                "title": "Title",
                "content": "Body",
                "tags": ["rust", "async"],
                "sourceConversationId": "conv-1"
            })
        );
    }

    #[test]
    fn draft_command_keeps_turn_order() {
        let cli = Cli::parse_from([
            "chappy-notes",
            "draft",
            "--turn",
            "user:What is Suspense?",
            "--turn",
            "assistant:A React feature.",
            "--topic",
            "React",
        ]);

        let (tool, arguments) = tool_call(cli.command).unwrap();

        assert_eq!(tool, "notes.generateDraft");
        let turns = &arguments["conversationContext"]["turns"];
        assert_eq!(turns[0]["role"], "user");
        assert_eq!(turns[1]["content"], "A React feature.");
        assert_eq!(arguments["conversationContext"]["topic"], "React");
    }

    #[test]
    fn search_command_omits_absent_options() {
        let cli = Cli::parse_from(["chappy-notes", "search", "async", "--limit", "3"]);
        let (tool, arguments) = tool_call(cli.command).unwrap();
        assert_eq!(tool, "notes.search");
        assert_eq!(arguments, json!({ "query": "async", "limit": 3 }));
    }

    #[test]
    fn call_command_rejects_malformed_json_as_user_error() {
        let cli = Cli::parse_from(["chappy-notes", "call", "notes.list", "{not json"]);
        let error = tool_call(cli.command).unwrap_err();
        assert!(is_user_error(&error));
    }

    #[test]
    fn validation_errors_are_user_errors() {
        let error = anyhow::Error::new(NotesError::Validation("title cannot be empty".into()))
            .context("notes.create failed");
        assert!(is_user_error(&error));

        let internal = anyhow::anyhow!("disk on fire");
        assert!(!is_user_error(&internal));
    }

    #[test]
    fn global_data_dir_flag_is_accepted_after_subcommand() {
        let cli = Cli::parse_from(["chappy-notes", "list", "--data-dir", "/tmp/n"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/n")));
    }
}
