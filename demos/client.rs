use std::time::Duration;

use skein::{Client, ConnectionConfig, Method, Request};

fn main() -> skein::Result<()> {
    futures_lite::future::block_on(async {
        let config = ConnectionConfig {
            send_timeout: Duration::from_secs(10),
            receive_timeout: Duration::from_secs(10),
            ..ConnectionConfig::default()
        };

        let req = Request::new(Method::Get, "127.0.0.1", 8080, "/");
        let client = Client::new(config);
        let mut res = client.execute(req).await?;

        println!("Response {:?}", res);
        println!("{}", res.body_string().await?);
        Ok(())
    })
}
