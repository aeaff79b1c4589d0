use kube::CustomResourceExt;
use microservice_controller::crd::{microservice::Microservice, scheduled_autoscaler::ScheduledAutoscaler};

// Print the CustomResourceDefinitions to install before starting the controller.
fn main() -> Result<(), serde_yaml::Error> {
    print!("{}", serde_yaml::to_string(&Microservice::crd())?);
    print!("{}", serde_yaml::to_string(&ScheduledAutoscaler::crd())?);
    Ok(())
}
