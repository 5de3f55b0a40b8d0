use std::thread;
use std::time::Duration;

use singleton_once::{set_trace_callback, singleton, Construct, Singleton, Teardown};

/// Head start given to the main thread before the workers touch the singleton.
const WORKER_DELAY: Duration = Duration::from_millis(100);
const WORKERS: usize = 2;

/// Only constructible through its accessor; construction is reported by the
/// trace callback installed in `main`.
struct MyClass {
   _private: (),
}

impl MyClass {
   fn new(_: Construct<Self>) -> Self {
      MyClass { _private: () }
   }
}

singleton!(MyClass => MyClass::new);

fn main() {
   set_trace_callback(|event| println!("{event}"));
   // SAFETY: every worker is joined before the guard is dropped.
   let _teardown = unsafe { Teardown::install() };

   let workers: Vec<_> = (1..=WORKERS)
      .map(|id| {
         thread::spawn(move || {
            thread::sleep(WORKER_DELAY);
            let instance = MyClass::instance();
            println!("thread {id}: {:p}", instance as *const MyClass);
         })
      })
      .collect();

   let singleton1 = MyClass::instance();
   let singleton2 = MyClass::instance();
   let singleton3 = MyClass::instance();
   println!(
      "main: {:p}, {:p}, {:p}",
      singleton1 as *const MyClass, singleton2 as *const MyClass, singleton3 as *const MyClass
   );

   for worker in workers {
      if worker.join().is_err() {
         eprintln!("worker thread panicked");
         std::process::exit(1);
      }
   }
}
