//! E-learning Platform Backend - binary entry point
//! Delegates to the library for all app logic.

#[tokio::main]
async fn main() {
    elearn_backend::run().await;
}
