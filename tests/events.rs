//! Lifecycle events reported through the trace callback.

use std::any::type_name;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use serial_test::serial;
use singleton_once::{
   clear_trace_callback, set_trace_callback, singleton, Construct, Singleton, SingletonEvent,
};

fn record() -> Arc<Mutex<Vec<SingletonEvent>>> {
   let events = Arc::new(Mutex::new(Vec::new()));
   let sink = Arc::clone(&events);
   set_trace_callback(move |event| sink.lock().unwrap().push(event.clone()));
   events
}

struct Traced;

impl Traced {
   fn new(_: Construct<Self>) -> Self {
      Traced
   }
}

singleton!(Traced => Traced::new);

#[test]
#[serial]
fn test_construction_is_reported_once_with_address() {
   let events = record();

   let instance = Traced::instance();
   let _ = Traced::instance();

   let captured = events.lock().unwrap().clone();
   clear_trace_callback();
   assert_eq!(
      captured,
      vec![SingletonEvent::Constructed {
         type_name: type_name::<Traced>(),
         address: instance as *const Traced as usize,
      }]
   );
   assert!(captured[0].to_string().contains("constructor called: 0x"));
}

struct Broken;

impl Broken {
   fn new(_: Construct<Self>) -> Self {
      panic!("cannot build");
   }
}

singleton!(Broken => Broken::new);

#[test]
#[serial]
fn test_aborted_construction_is_reported() {
   let events = record();

   assert!(panic::catch_unwind(AssertUnwindSafe(Broken::instance)).is_err());

   let captured = events.lock().unwrap().clone();
   clear_trace_callback();
   assert_eq!(
      captured,
      vec![SingletonEvent::ConstructionAborted { type_name: type_name::<Broken>() }]
   );
}

static RETRY_FAIL: AtomicBool = AtomicBool::new(true);

struct Retry;

impl Retry {
   fn new(_: Construct<Self>) -> Self {
      if RETRY_FAIL.swap(false, Ordering::SeqCst) {
         panic!("first attempt fails");
      }
      Retry
   }
}

singleton!(Retry => Retry::new);

#[test]
#[serial]
fn test_callback_may_retry_aborted_construction() {
   let (report, reports) = mpsc::channel();
   let report = Mutex::new(report);
   set_trace_callback(move |event| {
      if let SingletonEvent::ConstructionAborted { type_name } = event {
         if *type_name == std::any::type_name::<Retry>() {
            // The slot must already be unlocked, so another thread can build it.
            let (done, finished) = mpsc::channel();
            thread::spawn(move || {
               let _ = done.send(Retry::instance() as *const Retry as usize);
            });
            let retried = finished.recv_timeout(Duration::from_secs(5)).ok();
            let _ = report.lock().unwrap().send(retried);
         }
      }
   });

   assert!(panic::catch_unwind(AssertUnwindSafe(Retry::instance)).is_err());
   clear_trace_callback();

   let retried = reports.recv_timeout(Duration::from_secs(5)).unwrap();
   assert_eq!(retried, Some(Retry::instance() as *const Retry as usize));
   assert!(Retry::is_constructed());
}

struct Nested;

impl Nested {
   fn new(_: Construct<Self>) -> Self {
      Nested
   }
}

singleton!(Nested => Nested::new);

struct Quiet;

impl Quiet {
   fn new(_: Construct<Self>) -> Self {
      Quiet
   }
}

singleton!(Quiet => Quiet::new);

#[test]
#[serial]
fn test_callback_may_access_singletons() {
   set_trace_callback(|event| {
      if let SingletonEvent::Constructed { type_name, .. } = event {
         if *type_name == std::any::type_name::<Quiet>() {
            let _ = Nested::instance();
         }
      }
   });

   let _ = Quiet::instance();
   clear_trace_callback();
   assert!(Nested::is_constructed());
}

#[test]
#[serial]
fn test_cleared_callback_receives_nothing() {
   let events = record();
   clear_trace_callback();

   struct Late;
   impl Late {
      fn new(_: Construct<Self>) -> Self {
         Late
      }
   }
   singleton!(Late => Late::new);

   let _ = Late::instance();
   assert!(events.lock().unwrap().is_empty());
}
