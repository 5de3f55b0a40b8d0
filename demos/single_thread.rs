use singleton_once::{set_trace_callback, singleton, Construct, Singleton, Teardown};

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
   // SAFETY: single-threaded; no reference outlives `main`'s body.
   let _teardown = unsafe { Teardown::install() };

   let singleton1 = MyClass::instance();
   let singleton2 = MyClass::instance();
   let singleton3 = MyClass::instance();

   println!(
      "{:p}, {:p}, {:p}",
      singleton1 as *const MyClass, singleton2 as *const MyClass, singleton3 as *const MyClass
   );
}
