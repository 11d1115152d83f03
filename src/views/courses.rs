use crate::error::AppError;
use crate::models::Course;
use crate::routes::Route;
use crate::views::{CourseAssignmentsView, ListState, ViewContext};

const LOAD_FAILED: &str = "Failed to fetch courses";

/// Course cards, one per (teacher, course name) group.
pub struct CoursesView {
    ctx: ViewContext,
    list: ListState<Course>,
}

impl CoursesView {
    pub fn new(ctx: ViewContext) -> Self {
        Self {
            ctx,
            list: ListState::default(),
        }
    }

    pub fn list(&self) -> &ListState<Course> {
        &self.list
    }

    pub fn dismiss_banner(&mut self) {
        self.list.dismiss_banner();
    }

    pub async fn mount(&mut self) {
        self.ctx.lifetime().remount();
        if self.ctx.session().is_authenticated() {
            self.load().await;
        }
    }

    pub fn unmount(&self) {
        self.ctx.lifetime().unmount();
    }

    pub async fn on_session_changed(&mut self) {
        if self.ctx.session().is_authenticated() {
            self.load().await;
        } else {
            self.list.reset();
        }
    }

    pub async fn load(&mut self) {
        self.list.begin_load();
        let result = self
            .ctx
            .call(|api, token| async move { api.list_courses(&token).await })
            .await;
        self.list.finish_load(result, LOAD_FAILED);
    }

    pub fn render_cards(&self) -> String {
        if self.list.is_empty_state() {
            return "No courses yet.".to_string();
        }
        self.list
            .items()
            .iter()
            .enumerate()
            .map(|(n, course)| {
                format!(
                    "[{}] {}\n    Teacher: {}\n    {}",
                    n + 1,
                    course.course_name,
                    course.teacher_name,
                    course.assignments_label()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Route of the card at `index`.
    pub fn route_for(&self, index: usize) -> Option<Route> {
        self.list.items().get(index).map(|c| Route::CourseAssignments {
            teacher_id: c.teacher_id.to_string(),
            course_name: c.course_name.clone(),
        })
    }

    /// Follows the card at `index` into its assignments.
    pub async fn open_course(&self, index: usize) -> Result<CourseAssignmentsView, AppError> {
        let course = self.list.items().get(index).ok_or(AppError::NotFound)?;
        let mut view = CourseAssignmentsView::new(
            self.ctx.fork(),
            course.teacher_id.to_string(),
            course.course_name.clone(),
        );
        view.mount().await;
        Ok(view)
    }
}
