//! Navigation gate driven by the session's authentication state.

/// Destinations the client shell knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    SignIn,
    SignUp,
}

impl Route {
    pub fn access(self) -> RouteAccess {
        match self {
            Route::Home => RouteAccess::RequiresSession,
            Route::SignIn | Route::SignUp => RouteAccess::GuestOnly,
        }
    }
}

/// Who may enter a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// Only with a resolved identity.
    RequiresSession,
    /// Only without one (sign-in, sign-up).
    GuestOnly,
    /// Anyone.
    Public,
}

/// Outcome of a navigation check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Proceed,
    Redirect(Route),
}

/// Decide whether navigation to a route with `access` may proceed.
pub fn guard(access: RouteAccess, is_authenticated: bool) -> Navigation {
    match access {
        RouteAccess::RequiresSession if !is_authenticated => Navigation::Redirect(Route::SignIn),
        RouteAccess::GuestOnly if is_authenticated => Navigation::Redirect(Route::Home),
        _ => Navigation::Proceed,
    }
}
