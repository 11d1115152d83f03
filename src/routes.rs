use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::models::Role;
use crate::session::SessionStore;

/// Characters a path segment keeps as-is, the same set a browser leaves
/// alone when encoding a URI component.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    SignIn,
    Dashboard,
    Courses,
    CourseAssignments {
        teacher_id: String,
        course_name: String,
    },
    Submissions {
        assignment_id: i64,
    },
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Route::SignIn => "/signin".to_string(),
            Route::Dashboard => "/dashboard".to_string(),
            Route::Courses => "/courses".to_string(),
            Route::CourseAssignments {
                teacher_id,
                course_name,
            } => format!(
                "/courses/{}/{}",
                utf8_percent_encode(teacher_id, SEGMENT),
                utf8_percent_encode(course_name, SEGMENT)
            ),
            Route::Submissions { assignment_id } => {
                format!("/assignments/{}/submissions", assignment_id)
            }
        }
    }

    pub fn parse(path: &str) -> Option<Route> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        match segments.as_slice() {
            [""] | ["signin"] => Some(Route::SignIn),
            ["dashboard"] => Some(Route::Dashboard),
            ["courses"] => Some(Route::Courses),
            ["courses", teacher_id, course_name] => Some(Route::CourseAssignments {
                teacher_id: decode(teacher_id)?,
                course_name: decode(course_name)?,
            }),
            ["assignments", id, "submissions"] => id
                .parse()
                .ok()
                .map(|assignment_id| Route::Submissions { assignment_id }),
            _ => None,
        }
    }

    /// Where a signed-in user starts.
    pub fn landing(role: Role) -> Route {
        match role {
            Role::Teacher => Route::Dashboard,
            Role::Admin | Role::Student => Route::Courses,
        }
    }

    /// The route actually shown for `requested`. Everything but sign-in needs
    /// a session; sign-in while signed in goes to the landing page.
    pub fn resolve(requested: Route, session: &SessionStore) -> Route {
        match (session.current_user(), requested) {
            (None, _) => Route::SignIn,
            (Some(user), Route::SignIn) => Route::landing(user.role),
            (Some(_), route) => route,
        }
    }
}

fn decode(segment: &str) -> Option<String> {
    percent_decode_str(segment)
        .decode_utf8()
        .ok()
        .map(|s| s.into_owned())
}
