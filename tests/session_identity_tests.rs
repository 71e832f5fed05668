//! Session identity integration tests: concurrent first access, session isolation,
//! and the identity lifecycle through the session registry.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::time::Duration;

use skeleton::identity::{
    Authentication, IdentityError, InMemoryUserDirectory, Principal, SessionInfo, SessionRegistry, UserDirectory, UserRole,
};

// Directory that takes a while to answer and counts lookups, to widen race windows.
struct SlowDirectory {
    inner: InMemoryUserDirectory,
    delay: Duration,
    calls: AtomicUsize,
}

impl SlowDirectory {
    fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self { inner: InMemoryUserDirectory::with_demo_users(), delay, calls: AtomicUsize::new(0) })
    }
}

impl UserDirectory for SlowDirectory {
    fn load_by_username(&self, username: &str) -> Result<Principal, IdentityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.load_by_username(username)
    }
}

#[test]
fn concurrent_first_access_loads_once_and_agrees() {
    let dir = SlowDirectory::new(Duration::from_millis(50));
    let info = Arc::new(SessionInfo::new(dir.clone()));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let info = Arc::clone(&info);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let ctx = Authentication::authenticated("admin", ["ADMIN", "EMPLOYEE"]);
                barrier.wait();
                info.current_user(&ctx).expect("lookup").expect("admin")
            })
        })
        .collect();

    let users: Vec<Arc<Principal>> = handles.into_iter().map(|h| h.join().expect("thread")).collect();
    for u in &users {
        assert!(Arc::ptr_eq(u, &users[0]));
    }
    assert_eq!(users[0].username, "admin");
    assert_eq!(dir.calls.load(Ordering::SeqCst), 1);
    assert!(Arc::ptr_eq(&info.cached_user().expect("cached"), &users[0]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_access_from_blocking_tasks() {
    let dir = SlowDirectory::new(Duration::from_millis(30));
    let info = Arc::new(SessionInfo::new(dir.clone()));

    let tasks = (0..6).map(|_| {
        let info = Arc::clone(&info);
        tokio::task::spawn_blocking(move || {
            let ctx = Authentication::authenticated("user1", ["MANAGER", "EMPLOYEE"]);
            info.current_user(&ctx)
        })
    });
    let results = futures::future::join_all(tasks).await;

    let mut names = Vec::new();
    for r in results {
        let user = r.expect("join").expect("lookup").expect("user1");
        names.push(user.username.clone());
    }
    assert!(names.iter().all(|n| n == "user1"));
    assert_eq!(dir.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn sessions_are_isolated() {
    let dir = SlowDirectory::new(Duration::ZERO);
    let registry = SessionRegistry::new(dir.clone(), Duration::from_secs(60));
    let a = registry.open().expect("open");
    let b = registry.open().expect("open");

    let admin = Authentication::authenticated("admin", [UserRole::Admin.as_str()]);
    let user2 = Authentication::authenticated("user2", [UserRole::Employee.as_str()]);

    assert_eq!(a.info.current_user(&admin).unwrap().unwrap().username, "admin");
    assert_eq!(b.info.current_user(&user2).unwrap().unwrap().username, "user2");
    // each session pinned its own user
    assert_eq!(a.info.current_user(&user2).unwrap().unwrap().username, "admin");
    assert_eq!(b.info.current_user(&admin).unwrap().unwrap().username, "user2");
    assert_eq!(dir.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn logged_out_session_reports_nothing() {
    let registry = SessionRegistry::new(Arc::new(InMemoryUserDirectory::with_demo_users()), Duration::from_secs(60));
    let s = registry.open().expect("open");
    let anon = Authentication::anonymous();
    assert!(s.info.current_user(&anon).unwrap().is_none());
    assert_eq!(s.info.current_user_name(&anon), "");
    assert_eq!(s.info.current_user_roles(&anon), "");
    for role in ["ADMIN", "MANAGER", "EMPLOYEE", ""] {
        assert!(!s.info.has_role(&anon, role));
    }
}

#[test]
fn invalidation_forgets_the_pinned_user() {
    let dir = SlowDirectory::new(Duration::ZERO);
    let registry = SessionRegistry::new(dir.clone(), Duration::from_secs(60));
    let s = registry.open().expect("open");
    let admin = Authentication::authenticated("admin", ["ADMIN"]);
    s.info.current_user(&admin).unwrap();
    assert!(registry.invalidate(&s.id));

    let (next, created) = registry.get_or_open(Some(&s.id)).expect("open");
    assert!(created);
    let user2 = Authentication::authenticated("user2", ["EMPLOYEE"]);
    assert_eq!(next.info.current_user(&user2).unwrap().unwrap().username, "user2");
    assert_eq!(dir.calls.load(Ordering::SeqCst), 2);
}
