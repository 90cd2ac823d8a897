use anyhow::{bail, Result};
use mosaic::rpf::{decode, RpfFrameName, INVALID};

pub fn run(value: &str, cib: bool) -> Result<()> {
    if value.contains('.') {
        let Some(name) = RpfFrameName::parse(value, cib) else {
            bail!("Not an RPF frame name: {}", value);
        };

        println!("Frame:    {}", value);
        println!("Number:   {}", name.frame_number);
        println!("Version:  {}", name.version);
        println!("Producer: {}", name.producer);
        println!("Series:   {}", name.series);
        println!("Zone:     {}", name.zone);
        return Ok(());
    }

    match decode(Some(value))? {
        INVALID => bail!("Not a base-34 number: {}", value),
        n => println!("{}", n),
    }
    Ok(())
}
