//! This module provides ways to tweak the mocked backend, so that it can return errors on some tests

/// The routes of the backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MockRoute {
    Login,
    CurrentUser,
    GetTasks,
    CreateTask,
    UpdateTask,
    DeleteTask,
    Export,
}

/// How a mocked failure looks like
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MockFailure {
    /// No response at all
    Network,
    /// A response with this status code
    Status(u16),
}

impl Default for MockFailure {
    fn default() -> Self {
        MockFailure::Status(500)
    }
}

/// This stores some behaviour tweaks, that describe how a mocked backend will behave during a given test
///
/// So that a route fails _n_ times after _m_ initial successes, set `(m, n)` for the suited parameter
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    /// If this is true, every action will be allowed
    pub is_suspended: bool,
    /// How the failures look like
    pub failure: MockFailure,

    pub login_behaviour: (u32, u32),
    pub current_user_behaviour: (u32, u32),
    pub get_tasks_behaviour: (u32, u32),
    pub create_task_behaviour: (u32, u32),
    pub update_task_behaviour: (u32, u32),
    pub delete_task_behaviour: (u32, u32),
    pub export_behaviour: (u32, u32),
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// All routes will fail at once, for `n_fails` times
    pub fn fail_now(n_fails: u32) -> Self {
        Self {
            is_suspended: false,
            failure: MockFailure::default(),
            login_behaviour: (0, n_fails),
            current_user_behaviour: (0, n_fails),
            get_tasks_behaviour: (0, n_fails),
            create_task_behaviour: (0, n_fails),
            update_task_behaviour: (0, n_fails),
            delete_task_behaviour: (0, n_fails),
            export_behaviour: (0, n_fails),
        }
    }

    /// Only `route` will fail, for `n_fails` times, the way `failure` describes
    pub fn fail_route(route: MockRoute, n_fails: u32, failure: MockFailure) -> Self {
        let mut behaviour = Self { failure, ..Self::default() };
        *behaviour.counter_mut(route) = (0, n_fails);
        behaviour
    }

    /// Suspend this mock behaviour until you call `resume`
    pub fn suspend(&mut self) {
        self.is_suspended = true;
    }
    /// Make this behaviour active again
    pub fn resume(&mut self) {
        self.is_suspended = false;
    }

    fn counter_mut(&mut self, route: MockRoute) -> &mut (u32, u32) {
        match route {
            MockRoute::Login => &mut self.login_behaviour,
            MockRoute::CurrentUser => &mut self.current_user_behaviour,
            MockRoute::GetTasks => &mut self.get_tasks_behaviour,
            MockRoute::CreateTask => &mut self.create_task_behaviour,
            MockRoute::UpdateTask => &mut self.update_task_behaviour,
            MockRoute::DeleteTask => &mut self.delete_task_behaviour,
            MockRoute::Export => &mut self.export_behaviour,
        }
    }

    /// Tell whether a request to `route` must succeed this time, or how it must fail otherwise
    pub fn can(&mut self, route: MockRoute) -> Result<(), MockFailure> {
        if self.is_suspended { return Ok(()) }
        let failure = self.failure;
        decrement(self.counter_mut(route), route).map_err(|_| failure)
    }
}


/// Return Ok(()) in case the value is `(1+, _)` or `(_, 0)`, or return Err and decrement otherwise
fn decrement(value: &mut (u32, u32), route: MockRoute) -> Result<(), String> {
    let remaining_successes = value.0;
    let remaining_failures = value.1;

    if remaining_successes > 0 {
        value.0 = value.0 - 1;
        log::debug!("Mock behaviour: allowing a {:?} ({:?})", route, value);
        Ok(())
    } else {
        if remaining_failures > 0 {
            value.1 = value.1 - 1;
            log::debug!("Mock behaviour: failing a {:?} ({:?})", route, value);
            Err(format!("Mocked behaviour requires this {:?} to fail this time. ({:?})", route, value))
        } else {
            log::debug!("Mock behaviour: allowing a {:?} ({:?})", route, value);
            Ok(())
        }
    }
}
