//! Teardown ends the lifetime of every singleton in this process, so this
//! binary holds a single test.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::thread;

use singleton_once::{
   pending_teardown, set_trace_callback, singleton, Construct, Singleton, SingletonError,
   SingletonEvent, Teardown,
};

static DROP_ORDER: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());
static DATABASE_DROPS: AtomicUsize = AtomicUsize::new(0);

struct Database;

impl Database {
   fn new(_: Construct<Self>) -> Self {
      Database
   }
}

impl Drop for Database {
   fn drop(&mut self) {
      DATABASE_DROPS.fetch_add(1, Ordering::SeqCst);
      DROP_ORDER.lock().unwrap().push("database");
   }
}

struct Service {
   _db: &'static Database,
}

impl Service {
   fn new(_: Construct<Self>) -> Self {
      Service { _db: Database::instance() }
   }
}

impl Drop for Service {
   fn drop(&mut self) {
      DROP_ORDER.lock().unwrap().push("service");
   }
}

struct Cache;

impl Cache {
   fn new(_: Construct<Self>) -> Self {
      Cache
   }
}

impl Drop for Cache {
   fn drop(&mut self) {
      DROP_ORDER.lock().unwrap().push("cache");
   }
}

struct NeverUsed;

impl NeverUsed {
   fn new(_: Construct<Self>) -> Self {
      NeverUsed
   }
}

singleton!(Database => Database::new);
singleton!(Service => Service::new);
singleton!(Cache => Cache::new);
singleton!(NeverUsed => NeverUsed::new);

#[test]
fn test_teardown_destroys_in_reverse_construction_order() {
   let destroyed_events = std::sync::Arc::new(AtomicUsize::new(0));
   let counter = std::sync::Arc::clone(&destroyed_events);
   set_trace_callback(move |event| {
      if let SingletonEvent::Destroyed { .. } = event {
         counter.fetch_add(1, Ordering::SeqCst);
      }
   });

   // SAFETY: the worker is joined before `run`, and no reference is used afterwards.
   let teardown = unsafe { Teardown::install() };

   // Construction order: Database (inside Service's constructor), Service, Cache.
   let _ = Service::instance();
   thread::spawn(|| {
      let _ = Cache::instance();
   })
   .join()
   .unwrap();
   let _ = Database::instance();
   assert_eq!(pending_teardown(), 3);
   assert!(DROP_ORDER.lock().unwrap().is_empty());

   assert_eq!(teardown.run(), 3);

   assert_eq!(*DROP_ORDER.lock().unwrap(), ["cache", "service", "database"]);
   assert_eq!(DATABASE_DROPS.load(Ordering::SeqCst), 1);
   assert_eq!(destroyed_events.load(Ordering::SeqCst), 3);
   assert_eq!(pending_teardown(), 0);

   assert!(Database::slot().is_destroyed());
   assert!(!Database::is_constructed());
   assert_eq!(
      Service::try_instance().err(),
      Some(SingletonError::TornDown { type_name: std::any::type_name::<Service>() })
   );
   let panicked = std::panic::catch_unwind(|| {
      let _ = Cache::instance();
   });
   assert!(panicked.is_err());

   // A singleton never constructed before teardown can still be built lazily.
   let _ = NeverUsed::instance();
   assert_eq!(pending_teardown(), 1);

   // SAFETY: as above.
   drop(unsafe { Teardown::install() });
   assert!(NeverUsed::slot().is_destroyed());
   assert_eq!(DATABASE_DROPS.load(Ordering::SeqCst), 1);
}
