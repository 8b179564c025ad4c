#[macro_use]
extern crate rocket;

#[launch]
fn launch() -> _ {
    shipbroker_pipeline::rocket()
}
