use std::io::Write;

use clap::{Parser, Subcommand};

use schoolhub::auth::{AuthPanel, SignInForm, SignUpForm};
use schoolhub::config::ClientConfig;
use schoolhub::error::AppError;
use schoolhub::models::Role;
use schoolhub::routes::Route;
use schoolhub::state::AppState;
use schoolhub::views::{
    AssignmentsView, Banner, CoursesView, Severity, SubmissionsView, ViewContext,
};

#[derive(Parser)]
#[command(name = "schoolhub", version, about = "School assignments client", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sign in and remember the session.
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Create an account.
    Register {
        #[arg(long)]
        full_name: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "Teacher")]
        role: Role,
        #[arg(long)]
        password: String,
        /// Defaults to the password.
        #[arg(long)]
        confirm_password: Option<String>,
    },
    /// Forget the stored session.
    Logout,
    /// Show the signed-in user.
    Whoami,
    /// Manage assignments (Admin, Teacher).
    Assignments {
        #[command(subcommand)]
        action: AssignmentsAction,
    },
    /// Browse courses.
    Courses {
        #[command(subcommand)]
        action: CoursesAction,
    },
    /// Submit an answer (Student).
    Submit {
        assignment_id: i64,
        content: String,
    },
    /// List the submissions of an assignment.
    Submissions { assignment_id: i64 },
    /// Grade a submission (Teacher).
    Grade {
        assignment_id: i64,
        submission_id: i64,
        grade: String,
    },
}

#[derive(Subcommand)]
enum AssignmentsAction {
    List,
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        description: String,
        #[arg(long)]
        course: String,
        /// RFC 3339 or `YYYY-MM-DDTHH:MM` (UTC).
        #[arg(long)]
        deadline: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Empty string clears the deadline.
        #[arg(long)]
        deadline: Option<String>,
    },
    Delete {
        #[arg(required = true)]
        ids: Vec<i64>,
        /// Skip the confirmation prompt.
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum CoursesAction {
    List,
    /// Assignments of the N-th course in `courses list`.
    Show { number: usize },
}

/// Runs one command. `Ok(false)` means the view ended on an error banner.
pub async fn entrypoint() -> Result<bool, AppError> {
    let cli = Cli::parse();
    let config = ClientConfig::new_from_env()?;
    let state = AppState::from_config(&config).await?;

    match cli.command {
        Command::Login { email, password } => {
            let mut panel = AuthPanel::default();
            panel.sign_in = SignInForm { email, password };
            match panel.sign_in(state.api.as_ref(), &state.session).await {
                Ok(user) => {
                    println!("Signed in as {} ({})", user.display_name(), user.role);
                    println!("Start at {}", Route::landing(user.role).path());
                    Ok(true)
                }
                Err(_) => Ok(print_banner(panel.banner())),
            }
        }
        Command::Register {
            full_name,
            email,
            role,
            password,
            confirm_password,
        } => {
            let mut panel = AuthPanel::default();
            panel.sign_up = SignUpForm {
                full_name,
                email,
                role,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
            };
            let _ = panel.sign_up(state.api.as_ref()).await;
            Ok(print_banner(panel.banner()))
        }
        Command::Logout => {
            state.session.sign_out().await?;
            println!("Signed out");
            Ok(true)
        }
        Command::Whoami => {
            match state.session.current_user() {
                Some(user) => println!(
                    "{} <{}> {} (id {})",
                    user.display_name(),
                    user.email.as_deref().unwrap_or("-"),
                    user.role,
                    user.id
                ),
                None => println!("Not signed in"),
            }
            Ok(true)
        }
        Command::Assignments { action } => {
            if !signed_in(&state, Route::Dashboard) {
                return Ok(false);
            }
            assignments(&state, action).await
        }
        Command::Courses { action } => {
            if !signed_in(&state, Route::Courses) {
                return Ok(false);
            }
            courses(&state, action).await
        }
        Command::Submit {
            assignment_id,
            content,
        } => {
            if !signed_in(&state, Route::Courses) {
                return Ok(false);
            }
            submit(&state, assignment_id, &content).await
        }
        Command::Submissions { assignment_id } => {
            if !signed_in(&state, Route::Submissions { assignment_id }) {
                return Ok(false);
            }
            let mut view = SubmissionsView::new(ViewContext::new(&state), assignment_id);
            view.mount().await;
            println!("{}", view.heading());
            println!("{}", view.table().render(view.list().items()));
            Ok(print_banner(view.list().banner()))
        }
        Command::Grade {
            assignment_id,
            submission_id,
            grade,
        } => {
            if !signed_in(&state, Route::Submissions { assignment_id }) {
                return Ok(false);
            }
            let mut view = SubmissionsView::new(ViewContext::new(&state), assignment_id);
            view.mount().await;
            view.set_grade_input(submission_id, &grade);
            if view.request_grade(submission_id).is_ok() {
                if let Some(pending) = view.confirm_dialog().pending() {
                    println!("{}", pending.prompt());
                }
                let _ = view.confirm_grade().await;
            }
            println!("{}", view.table().render(view.list().items()));
            Ok(print_banner(view.list().banner()))
        }
    }
}

async fn assignments(state: &AppState, action: AssignmentsAction) -> Result<bool, AppError> {
    let mut view = AssignmentsView::new(ViewContext::new(state));
    view.mount().await;

    match action {
        AssignmentsAction::List => {}
        AssignmentsAction::Create {
            title,
            description,
            course,
            deadline,
        } => {
            if !view.open_add_dialog() {
                println!("Your role cannot add assignments");
                return Ok(false);
            }
            let dialog = view.add_dialog_mut();
            dialog.on_change("title", &title)?;
            dialog.on_change("description", &description)?;
            dialog.on_change("courseName", &course)?;
            dialog.on_change("deadline", deadline.as_deref().unwrap_or(""))?;
            let _ = view.submit_add_dialog().await;
        }
        AssignmentsAction::Update {
            id,
            title,
            description,
            deadline,
        } => {
            if !view.open_update_dialog(id) {
                println!("Assignment {} is not available for editing", id);
                return Ok(false);
            }
            let dialog = view.update_dialog_mut();
            for (field, value) in [("title", title), ("description", description), ("deadline", deadline)] {
                if let Some(value) = value {
                    dialog.on_change(field, &value)?;
                }
            }
            let _ = view.submit_update_dialog().await;
        }
        AssignmentsAction::Delete { ids, yes } => {
            let mut table = view.table();
            table.select(ids);
            let mut chosen = Vec::new();
            if !table.delete_selected(|selected| chosen = selected) {
                println!("Your role cannot delete assignments");
                return Ok(false);
            }
            if view.request_delete(&chosen).is_err() {
                return Ok(print_banner(view.list().banner()));
            }
            let prompt = view.delete_dialog().pending().map(|p| p.prompt());
            if yes || prompt.as_deref().is_some_and(confirm) {
                let _ = view.confirm_delete().await;
            } else {
                view.cancel_delete();
                println!("Nothing deleted");
                return Ok(true);
            }
        }
    }

    println!("{}", view.table().render(view.list().items()));
    Ok(print_banner(view.list().banner()))
}

async fn courses(state: &AppState, action: CoursesAction) -> Result<bool, AppError> {
    let mut view = CoursesView::new(ViewContext::new(state));
    view.mount().await;

    match action {
        CoursesAction::List => {
            println!("{}", view.render_cards());
            Ok(print_banner(view.list().banner()))
        }
        CoursesAction::Show { number } => {
            let course = number
                .checked_sub(1)
                .map(|index| (index, view.route_for(index)));
            let Some((index, Some(route))) = course else {
                println!("No course number {}", number);
                return Ok(false);
            };
            let inner = view.open_course(index).await?;
            println!("{} ({})", inner.heading(), route.path());
            println!("{}", inner.table().render(inner.list().items()));
            Ok(print_banner(inner.list().banner()))
        }
    }
}

/// Finds the course holding `assignment_id` and submits through its view.
async fn submit(state: &AppState, assignment_id: i64, content: &str) -> Result<bool, AppError> {
    let mut courses = CoursesView::new(ViewContext::new(state));
    courses.mount().await;
    let index = courses
        .list()
        .items()
        .iter()
        .position(|c| c.assignments.iter().any(|a| a.id == assignment_id));
    let Some(index) = index else {
        if !print_banner(courses.list().banner()) {
            return Ok(false);
        }
        println!("Assignment {} not found in your courses", assignment_id);
        return Ok(false);
    };

    let mut view = courses.open_course(index).await?;
    if view.open_submit_dialog(assignment_id).is_ok() {
        view.submit_dialog_mut().on_change("content", content)?;
        let _ = view.submit_dialog_confirm().await;
    }
    println!("{}", view.table().render(view.list().items()));
    Ok(print_banner(view.list().banner()))
}

/// Asks on stdin; anything but y/yes declines.
fn confirm(prompt: &str) -> bool {
    print!("{} [y/N] ", prompt);
    if std::io::stdout().flush().is_err() {
        return false;
    }
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn signed_in(state: &AppState, requested: Route) -> bool {
    if Route::resolve(requested, &state.session) == Route::SignIn {
        println!("You must be logged in. Run `schoolhub login` first.");
        return false;
    }
    true
}

/// Prints the banner; false when it reports an error.
fn print_banner(banner: Option<&Banner>) -> bool {
    match banner {
        Some(banner) => {
            let tag = match banner.severity {
                Severity::Success => "ok",
                Severity::Info => "info",
                Severity::Error => "error",
            };
            println!("[{}] {}", tag, banner.text);
            !banner.is_error()
        }
        None => true,
    }
}
